use std::error::Error;

use indicatif::{ProgressBar, ProgressStyle};
use nalgebra::{vector, Vector3};
use rayon::prelude::*;

use crate::{
    config::{Config, GeneratorConfig},
    file::{write_tf_file, write_volume_file},
};

mod shapes;
mod solid;
mod sphere;

pub use shapes::ShapesGenerator;
pub use solid::SolidGenerator;
pub use sphere::SphereGenerator;

// Generates one sample at a time, at any location
pub trait SampleGenerator: Sync {
    fn sample_at(&self, coords: Vector3<u32>) -> u8;
}

pub fn get_sample_generator(config: &Config) -> Box<dyn SampleGenerator> {
    match config.generator {
        GeneratorConfig::Shapes {
            n_of_shapes,
            sample,
            obj_size,
        } => Box::new(ShapesGenerator::new(
            config.dims,
            n_of_shapes,
            sample,
            obj_size,
            config.seed,
        )),
        GeneratorConfig::Solid { sample } => Box::new(SolidGenerator::new(config.dims, sample)),
        GeneratorConfig::Sphere { sample } => Box::new(SphereGenerator::new(config.dims, sample)),
    }
}

/// Samples in linear order, x fastest.
/// Z slices are generated in parallel.
pub fn generate_linear_order(
    sg: &dyn SampleGenerator,
    dims: Vector3<u32>,
    progress: &ProgressBar,
) -> Vec<u8> {
    let dims_us = dims.map(|v| v as usize);
    let slice_len = dims_us.x * dims_us.y;
    let mut samples = vec![0; slice_len * dims_us.z];

    samples
        .par_chunks_mut(slice_len)
        .enumerate()
        .for_each(|(z, slice)| {
            for y in 0..dims.y {
                for x in 0..dims.x {
                    let index = y as usize * dims_us.x + x as usize;
                    slice[index] = sg.sample_at(vector![x, y, z as u32]);
                }
            }
            progress.inc(1);
        });

    samples
}

pub fn generate_vol(config: &Config) -> Result<(), Box<dyn Error>> {
    let gen = get_sample_generator(config);

    let progress = ProgressBar::new(config.dims.z as u64);
    progress.set_style(
        ProgressStyle::default_bar().template("{elapsed_precise} [{bar:40}] {pos}/{len} slices"),
    );

    let samples = generate_linear_order(gen.as_ref(), config.dims, &progress);
    progress.finish_and_clear();
    log::info!("Generated {} samples", samples.len());

    write_volume_file(config, &samples)?;
    log::info!("Volume written to {:?}", config.file_name);

    if let Some(tf_file) = &config.tf_file {
        write_tf_file(tf_file, config.tf_preset)?;
        log::info!("Transfer function {:?} written to {:?}", config.tf_preset, tf_file);
    }

    Ok(())
}
