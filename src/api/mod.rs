pub mod applications;
pub mod attendance;
pub mod feedback;
pub mod mail;
pub mod syllabus;
pub mod timetable;
pub mod users;
