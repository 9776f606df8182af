#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatasetSplit {
    Train,
    Test,
    Val,
}

impl DatasetSplit {
    /// Name of the split's manifest file, e.g. `train.csv`.
    pub fn csv_name(&self) -> &'static str {
        match self {
            DatasetSplit::Train => "train.csv",
            DatasetSplit::Test => "test.csv",
            DatasetSplit::Val => "val.csv",
        }
    }
}
