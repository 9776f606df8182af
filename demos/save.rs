use mini_image::datasets::{DatasetSplit, MiniImage, MiniImageConfig};
use rand::prelude::*;

fn main() {
    let mut rng = StdRng::seed_from_u64(0);
    let config = MiniImageConfig::for_split("./datasets/mini-imagenet", DatasetSplit::Test);
    let dataset = MiniImage::open(config, &mut rng).unwrap();

    let missing = dataset.verify_files();
    if !missing.is_empty() {
        println!(
            "{} images missing under {}",
            missing.len(),
            dataset.root_dir().display()
        );
        return;
    }

    println!(
        "{} rows, {} classes, way offsets {:?}",
        dataset.manifest().len(),
        dataset.num_classes(),
        dataset.way_offsets()
    );
    for i in 0..dataset.len().min(10) {
        let sample = dataset.get(i).unwrap();
        let name = dataset.label_name(sample.label).unwrap();
        sample.data.save(std::format!("img-{i}-{name}.png")).unwrap();
    }
}
