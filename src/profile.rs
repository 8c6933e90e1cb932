pub mod cutpoint;
pub mod cutprofile;
