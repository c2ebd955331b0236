//! Binary blobs for volumes and transfer functions.
//!
//! Both formats are little-endian and start with a magic tag and a version byte.
//! Reading back a written blob yields bit-identical rendering inputs.

mod tf_blob;
mod volume_blob;

pub use tf_blob::{read_transfer_function, write_transfer_function, TF_MAGIC, TF_VERSION};
pub use volume_blob::{
    read_volume, read_volume_file, read_volume_header, write_volume, write_volume_file,
    write_volume_parts, VOLUME_HEADER_LEN, VOLUME_MAGIC, VOLUME_VERSION,
};
