pub mod copier;
pub mod digest;
pub mod filter;
pub mod grep;
pub mod manifest;

pub use copier::{
    copy_folder_contents, copy_folder_contents_with_filter, mirror_async, MirrorOptions,
    MirrorReport, TreeCopier, DEFAULT_MANIFEST_NAME,
};
pub use digest::tree_digest;
pub use filter::{Filter, HiddenFilter, PatternFilter};
pub use grep::grep;
pub use manifest::Manifest;
