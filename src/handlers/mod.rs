pub mod admin;
pub mod events;
pub mod jobtread;
pub mod leads;
