pub mod entry;
pub mod entry_file;
pub mod image;

pub use entry::EntryRepository;
pub use entry_file::EntryFileRepository;
pub use image::ImageRepository;
