use std::{
    error::Error,
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
};

use raymarch_lib::{
    persist::{write_transfer_function, write_volume_parts},
    volumetric::{ScalarEncoding, VolumeInfo},
};

use crate::config::{Config, TfPreset};

pub fn open_create_file<P>(path: P) -> Result<File, std::io::Error>
where
    P: AsRef<Path>,
{
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

/// Write `samples` (u8, linear order) as a volume blob
pub fn write_volume_file(config: &Config, samples: &[u8]) -> Result<(), Box<dyn Error>> {
    let info = VolumeInfo {
        dims: config.dims.map(|v| v as usize),
        spacing: config.spacing,
        encoding: ScalarEncoding::u8(),
    };

    let mut writer = BufWriter::new(open_create_file(&config.file_name)?);
    write_volume_parts(&mut writer, &info, samples)?;
    writer.flush()?;
    Ok(())
}

pub fn write_tf_file<P>(path: P, preset: TfPreset) -> Result<(), Box<dyn Error>>
where
    P: AsRef<Path>,
{
    let tf = preset.build();
    let mut writer = BufWriter::new(open_create_file(path)?);
    write_transfer_function(&mut writer, &tf)?;
    writer.flush()?;
    Ok(())
}
