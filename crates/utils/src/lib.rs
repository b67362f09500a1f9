pub mod api_try;
pub mod response;
pub mod validation;
