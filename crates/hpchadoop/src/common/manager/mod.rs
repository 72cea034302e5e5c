pub mod info;
pub mod lsf;
pub mod slurm;
