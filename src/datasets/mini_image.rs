use std::{
    path::{Path, PathBuf},
    sync::{Mutex, PoisonError},
};

use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};

use super::{
    errors::{DatasetError, Result},
    manifest::{ClassIndex, Manifest, ManifestRow},
    split::DatasetSplit,
    transform::{Identity, Transform},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MiniImageConfig {
    /// Manifest with `filename` and `label` columns.
    pub csv_file: PathBuf,
    /// Images live at `root_dir/<label>/<filename>`.
    pub root_dir: PathBuf,
    /// Number of class offsets drawn at construction.
    pub way: usize,
}

impl MiniImageConfig {
    pub const DEFAULT_WAY: usize = 5;

    pub fn new<P: AsRef<Path>, Q: AsRef<Path>>(csv_file: P, root_dir: Q) -> Self {
        Self {
            csv_file: csv_file.as_ref().to_path_buf(),
            root_dir: root_dir.as_ref().to_path_buf(),
            way: Self::DEFAULT_WAY,
        }
    }

    /// `dir/<split>.csv` with images under `dir/images`.
    pub fn for_split<P: AsRef<Path>>(dir: P, split: DatasetSplit) -> Self {
        let dir = dir.as_ref();
        Self::new(dir.join(split.csv_name()), dir.join("images"))
    }

    pub fn with_way(mut self, way: usize) -> Self {
        self.way = way;
        self
    }
}

/// A decoded (and transformed) image with its class code.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample<D> {
    pub data: D,
    pub label: usize,
}

/// Few-shot image dataset described by a `filename,label` manifest.
///
/// At construction `way` offsets are drawn with replacement from the rows at
/// which each class first appears. Every access then picks one of those
/// offsets at random and reads the row `position + offset`.
pub struct MiniImage<T = Identity> {
    manifest: Manifest,
    classes: ClassIndex,
    root_dir: PathBuf,
    transform: T,
    way_offsets: Vec<usize>,
    rng: Mutex<StdRng>,
}

impl MiniImage<Identity> {
    /// Builds the dataset without a transform; samples hold the decoded image.
    pub fn open<R: Rng + ?Sized>(config: MiniImageConfig, rng: &mut R) -> Result<Self> {
        Self::new(config, Identity, rng)
    }
}

impl<T> MiniImage<T> {
    pub fn new<R: Rng + ?Sized>(
        config: MiniImageConfig,
        transform: T,
        rng: &mut R,
    ) -> Result<Self> {
        let manifest = Manifest::from_path(&config.csv_file)?;
        if manifest.is_empty() {
            return Err(DatasetError::EmptyManifest {
                path: config.csv_file,
            });
        }
        let classes = ClassIndex::new(&manifest);

        let way_offsets: Vec<usize> = (0..config.way)
            .filter_map(|_| classes.first_indices().choose(&mut *rng).copied())
            .collect();

        tracing::debug!(
            rows = manifest.len(),
            classes = classes.num_classes(),
            ?way_offsets,
            "loaded manifest {}",
            config.csv_file.display()
        );

        Ok(Self {
            manifest,
            classes,
            root_dir: config.root_dir,
            transform,
            way_offsets,
            rng: Mutex::new(StdRng::seed_from_u64(rng.gen())),
        })
    }

    /// Row at which the second class (in label order) first appears.
    ///
    /// This is not the number of rows nor the number of classes. It only
    /// bounds how far `position` can go before the offsets drawn at
    /// construction run past the next class. Returns 0 with fewer than two
    /// classes.
    pub fn len(&self) -> usize {
        self.classes.first_indices().get(1).copied().unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn classes(&self) -> &ClassIndex {
        &self.classes
    }

    pub fn num_classes(&self) -> usize {
        self.classes.num_classes()
    }

    pub fn label_name(&self, code: usize) -> Option<&str> {
        self.classes.label_name(code)
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    pub fn way(&self) -> usize {
        self.way_offsets.len()
    }

    /// The class offsets drawn at construction. May contain duplicates.
    pub fn way_offsets(&self) -> &[usize] {
        &self.way_offsets
    }

    pub fn image_path(&self, row: usize) -> Option<PathBuf> {
        self.manifest.get(row).map(|r| self.row_path(r))
    }

    fn row_path(&self, row: &ManifestRow) -> PathBuf {
        self.root_dir.join(&row.label).join(&row.filename)
    }

    /// Checks that every manifest row points at an existing file and returns
    /// the ones that don't.
    pub fn verify_files(&self) -> Vec<PathBuf> {
        let pb = indicatif::ProgressBar::new(self.manifest.len() as u64);
        let mut missing = Vec::new();
        for row in self.manifest.rows() {
            let path = self.row_path(row);
            if !path.is_file() {
                tracing::warn!("missing image {}", path.display());
                missing.push(path);
            }
            pb.inc(1);
        }
        pb.finish_and_clear();
        missing
    }
}

impl<T: Transform> MiniImage<T> {
    /// Reads row `position + offset`, where `offset` is drawn from
    /// [`Self::way_offsets`] with `rng` on every call.
    ///
    /// `position` is not checked against [`Self::len`]; only the final row
    /// is bounds checked.
    pub fn get_with<R: Rng + ?Sized>(
        &self,
        position: usize,
        rng: &mut R,
    ) -> Result<Sample<T::Output>> {
        let offset = self.choose_offset(rng)?;
        self.read_row(position, offset)
    }

    /// Same as [`Self::get_with`] using the dataset's own rng, seeded from the
    /// rng passed at construction.
    pub fn get(&self, position: usize) -> Result<Sample<T::Output>> {
        // the lock only covers the draw, decoding runs unlocked
        let offset = {
            let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
            self.choose_offset(&mut *rng)?
        };
        self.read_row(position, offset)
    }

    fn choose_offset<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<usize> {
        self.way_offsets
            .choose(rng)
            .copied()
            .ok_or(DatasetError::EmptyWaySubset)
    }

    fn read_row(&self, position: usize, offset: usize) -> Result<Sample<T::Output>> {
        let len = self.manifest.len();
        let row = position
            .checked_add(offset)
            .and_then(|index| self.manifest.get(index))
            .ok_or(DatasetError::IndexOutOfRange {
                index: position.saturating_add(offset),
                len,
            })?;

        let path = self.row_path(row);
        tracing::trace!(position, offset, "reading {}", path.display());
        let img = image::open(&path).map_err(|source| DatasetError::ImageDecode {
            path: path.clone(),
            source,
        })?;
        let data = self.transform.apply(img);

        let label = self
            .classes
            .code(&row.label)
            .ok_or_else(|| DatasetError::UnknownLabel(row.label.clone()))?;
        Ok(Sample { data, label })
    }
}

impl<T: Transform> dfdx::data::ExactSizeDataset for MiniImage<T> {
    type Item<'a> = Result<Sample<T::Output>> where Self: 'a;
    fn get(&self, index: usize) -> Self::Item<'_> {
        MiniImage::get(self, index)
    }
    fn len(&self) -> usize {
        MiniImage::len(self)
    }
}
