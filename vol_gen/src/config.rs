use std::{ffi::OsString, str::FromStr};

use clap::ArgMatches;
use nalgebra::{vector, Vector3};
use raymarch_lib::{premade::transfer_functions, transfer_function::TransferFunction};

/// Transform `Values` into `Vector`
fn values_to_vector3<T>(args: &ArgMatches, key: &str) -> Result<Vector3<T>, String>
where
    T: FromStr + Copy,
{
    let vals = args
        .values_of(key)
        .ok_or_else(|| format!("missing argument {key}"))?
        .map(|v| v.parse::<T>().map_err(|_| format!("cannot parse {key} value {v}")))
        .collect::<Result<Vec<T>, String>>()?;
    match vals[..] {
        [x, y, z] => Ok(vector![x, y, z]),
        _ => Err(format!("{key} needs 3 values")),
    }
}

fn parse_value<T: FromStr>(args: &ArgMatches, key: &str) -> Result<T, String> {
    let s = args
        .value_of(key)
        .ok_or_else(|| format!("missing argument {key}"))?;
    s.parse()
        .map_err(|_| format!("cannot parse {key} value {s}"))
}

/// App configuration
/// Config is built from args parsed by `clap`
#[derive(Debug)]
pub struct Config {
    /// Dimensions of volume
    pub dims: Vector3<u32>,
    /// Physical size of one voxel
    pub spacing: Vector3<f32>,
    /// Type of generator to be used
    pub generator: GeneratorConfig,
    // Output file name
    pub file_name: OsString,
    /// Optional transfer function output
    pub tf_file: Option<OsString>,
    pub tf_preset: TfPreset,
    /// Optional seed for RNG, to replicate results
    pub seed: Option<u64>,
}

impl Config {
    pub fn from_args(args: &ArgMatches) -> Result<Config, String> {
        let dims = values_to_vector3(args, "dims")?;
        let spacing = values_to_vector3(args, "spacing")?;
        let generator = GeneratorConfig::from_args(args)?;

        // Has default value
        let file_name = args
            .value_of_os("output-file")
            .map(OsString::from)
            .unwrap_or_else(|| "a.rmvol".into());
        let tf_file = args.value_of_os("tf-file").map(OsString::from);
        let tf_preset = parse_value(args, "tf-preset")?;

        let seed = match args.value_of("seed") {
            Some(_) => Some(parse_value(args, "seed")?),
            None => None,
        };

        Ok(Config {
            dims,
            spacing,
            generator,
            file_name,
            tf_file,
            tf_preset,
            seed,
        })
    }
}

/// Settings specific to generator variant
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GeneratorConfig {
    /// Randomly placed cuboids and spheres
    Shapes {
        n_of_shapes: usize,
        sample: u8,
        obj_size: u32,
    },
    /// Solid block with a padding of empty voxels
    Solid { sample: u8 },
    /// Centered sphere fading from `sample` at the center to 0 at the surface
    Sphere { sample: u8 },
}

impl GeneratorConfig {
    pub fn from_args(args: &ArgMatches) -> Result<GeneratorConfig, String> {
        let name = args
            .value_of("generator")
            .ok_or_else(|| "missing argument generator".to_string())?;

        match name {
            "shapes" => Ok(GeneratorConfig::Shapes {
                n_of_shapes: parse_value(args, "n-of-shapes")?,
                sample: parse_value(args, "sample")?,
                obj_size: parse_value(args, "object-size")?,
            }),
            "solid" => Ok(GeneratorConfig::Solid {
                sample: parse_value(args, "sample")?,
            }),
            "sphere" => Ok(GeneratorConfig::Sphere {
                sample: parse_value(args, "sample")?,
            }),
            other => Err(format!("unknown generator {other}")),
        }
    }
}

/// Premade transfer function stored next to the volume
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TfPreset {
    Grayscale,
    Bone,
    SoftTissue,
    Opaque,
}

impl TfPreset {
    pub fn build(self) -> TransferFunction {
        match self {
            TfPreset::Grayscale => transfer_functions::grayscale_ramp(),
            TfPreset::Bone => transfer_functions::ct_bone(),
            TfPreset::SoftTissue => transfer_functions::ct_soft_tissue(),
            TfPreset::Opaque => transfer_functions::opaque(vector![0.9, 0.9, 0.9]),
        }
    }
}

impl FromStr for TfPreset {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grayscale" => Ok(TfPreset::Grayscale),
            "bone" => Ok(TfPreset::Bone),
            "soft-tissue" => Ok(TfPreset::SoftTissue),
            "opaque" => Ok(TfPreset::Opaque),
            _ => Err(()),
        }
    }
}
