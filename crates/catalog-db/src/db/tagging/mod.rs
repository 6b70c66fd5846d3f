pub mod tag;
pub mod tag_type;

pub use tag::TagRepository;
pub use tag_type::TagTypeRepository;
