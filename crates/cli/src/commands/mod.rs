pub mod ask;
pub mod chat;
pub mod context;
pub mod doctor;
