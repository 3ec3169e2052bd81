pub mod origin;
pub mod request_id;
