pub mod errors;
pub mod manifest;
pub mod mini_image;
pub mod split;
pub mod transform;

pub use errors::{DatasetError, Result};
pub use manifest::{ClassIndex, Manifest, ManifestRow};
pub use mini_image::{MiniImage, MiniImageConfig, Sample};
pub use split::DatasetSplit;
pub use transform::{
    mini_imagenet, CenterCrop, Grayscale, Identity, ImageTensor, Resize, Then, ToTensor, Transform,
};
