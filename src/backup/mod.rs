pub(crate) mod db_dump;    // Runs the dump utility into a local artifact
pub(crate) mod logic;      // One backup cycle: name, dump, upload
pub(crate) mod naming;
pub(crate) mod s3_upload;  // S3-compatible artifact store
pub(crate) mod store;      // Artifact store seam and the upload stage

#[cfg(test)]
pub(crate) mod testing;

pub use logic::BackupCycle;
