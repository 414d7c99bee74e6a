pub mod application;
pub mod attendance;
pub mod feedback;
pub mod role;
pub mod syllabus;
pub mod timetable;
pub mod user;
