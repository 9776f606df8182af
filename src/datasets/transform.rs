use dfdx::prelude::{Cpu, Tensor, TensorFromVec};
use image::{imageops::FilterType, DynamicImage, GenericImageView};

pub trait Transform<In = DynamicImage> {
    type Output;

    fn apply(&self, input: In) -> Self::Output;

    /// Runs `self` then `next` on its output.
    fn then<B>(self, next: B) -> Then<Self, B>
    where
        Self: Sized,
        B: Transform<Self::Output>,
    {
        Then(self, next)
    }
}

/// Leaves the input untouched.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<In> Transform<In> for Identity {
    type Output = In;
    fn apply(&self, input: In) -> In {
        input
    }
}

#[derive(Debug, Clone, Copy)]
pub struct Then<A, B>(pub A, pub B);

impl<In, A, B> Transform<In> for Then<A, B>
where
    A: Transform<In>,
    B: Transform<A::Output>,
{
    type Output = B::Output;
    fn apply(&self, input: In) -> Self::Output {
        self.1.apply(self.0.apply(input))
    }
}

/// Resizes to exactly `width` x `height`, ignoring aspect ratio.
#[derive(Debug, Clone, Copy)]
pub struct Resize {
    pub width: u32,
    pub height: u32,
    pub filter: FilterType,
}

impl Resize {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            filter: FilterType::Triangle,
        }
    }
}

impl Transform for Resize {
    type Output = DynamicImage;
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        img.resize_exact(self.width, self.height, self.filter)
    }
}

/// Crops a centered `width` x `height` window, clamped to the image bounds.
#[derive(Debug, Clone, Copy)]
pub struct CenterCrop {
    pub width: u32,
    pub height: u32,
}

impl CenterCrop {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl Transform for CenterCrop {
    type Output = DynamicImage;
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        let (w, h) = img.dimensions();
        let cw = self.width.min(w);
        let ch = self.height.min(h);
        img.crop_imm((w - cw) / 2, (h - ch) / 2, cw, ch)
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct Grayscale;

impl Transform for Grayscale {
    type Output = DynamicImage;
    fn apply(&self, img: DynamicImage) -> DynamicImage {
        DynamicImage::ImageLuma8(img.to_luma8())
    }
}

pub type ImageTensor = Tensor<(usize, usize, usize), f32, Cpu>;

/// Converts an image into a `(channels, height, width)` tensor with values
/// scaled to `[0, 1]`, then normalized per channel as `(x - mean) / std`.
///
/// Luma images produce one channel, everything else is converted to rgb.
#[derive(Clone)]
pub struct ToTensor {
    dev: Cpu,
    mean: [f32; 3],
    std: [f32; 3],
}

impl ToTensor {
    pub fn new(dev: Cpu) -> Self {
        Self {
            dev,
            mean: [0.0; 3],
            std: [1.0; 3],
        }
    }

    pub fn normalized(mut self, mean: [f32; 3], std: [f32; 3]) -> Self {
        self.mean = mean;
        self.std = std;
        self
    }
}

impl Default for ToTensor {
    fn default() -> Self {
        Self::new(Default::default())
    }
}

impl Transform for ToTensor {
    type Output = ImageTensor;
    fn apply(&self, img: DynamicImage) -> ImageTensor {
        let (w, h) = img.dimensions();
        let (w, h) = (w as usize, h as usize);
        let (channels, raw) = match img {
            DynamicImage::ImageLuma8(luma) => (1, luma.into_raw()),
            other => (3, other.to_rgb8().into_raw()),
        };

        // interleaved HWC -> planar CHW
        let mut data = vec![0.0; channels * h * w];
        for (i, &p) in raw.iter().enumerate() {
            let c = i % channels;
            let hw = i / channels;
            let v = p as f32 / 255.0;
            data[c * h * w + hw] = (v - self.mean[c]) / self.std[c];
        }
        self.dev.tensor_from_vec(data, (channels, h, w))
    }
}

/// Resize to 84x84 and convert to a normalized tensor, the usual preprocessing
/// for mini-ImageNet style episodes.
pub fn mini_imagenet(dev: Cpu) -> Then<Resize, ToTensor> {
    Resize::new(84, 84).then(ToTensor::new(dev).normalized(
        [0.485, 0.456, 0.406],
        [0.229, 0.224, 0.225],
    ))
}
