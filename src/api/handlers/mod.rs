pub mod health;
pub mod verify_id_token;
