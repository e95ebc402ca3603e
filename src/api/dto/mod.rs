pub mod verify_id_token;
