pub mod crm;
pub mod event;
pub mod lead;
pub mod rep;
pub mod touch_point;
