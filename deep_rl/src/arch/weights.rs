use std::{
    fs,
    io::{Read, Write},
    path::Path,
};

use log::info;

use super::Model;
use crate::{Result, RlErr};

/// Writes `params` as a raw block of native endian `f32`s, with no header.
pub fn write_weights<W: Write>(writer: &mut W, params: &[f32]) -> Result<()> {
    writer.write_all(bytemuck::cast_slice(params))?;
    Ok(())
}

/// Reads exactly `len` raw `f32`s.
///
/// # Returns
/// The parameters, or an error if the reader ends early or holds more bytes than expected.
pub fn read_weights<R: Read>(reader: &mut R, len: usize) -> Result<Vec<f32>> {
    let mut bytes = Vec::with_capacity(len * size_of::<f32>());
    reader.read_to_end(&mut bytes)?;

    let expected = len * size_of::<f32>();
    if bytes.len() != expected {
        return Err(RlErr::WeightsLength {
            got: bytes.len(),
            expected,
        });
    }

    Ok(bytemuck::pod_collect_to_vec(&bytes))
}

/// Dumps the model's parameters into the file at `path`.
pub fn save_weights<P: AsRef<Path>>(model: &Model, path: P) -> Result<()> {
    let mut file = fs::File::create(path.as_ref())?;
    write_weights(&mut file, model.parameters().as_slice())?;
    info!(params = model.size(); "saved weights to {}", path.as_ref().display());
    Ok(())
}

/// Loads the parameters of an identically shaped model from the file at `path`.
pub fn load_weights<P: AsRef<Path>>(model: &mut Model, path: P) -> Result<()> {
    let mut file = fs::File::open(path.as_ref())?;
    let params = read_weights(&mut file, model.size())?;
    model.set_parameters(&params)?;
    info!(params = model.size(); "loaded weights from {}", path.as_ref().display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;
    use crate::{arch::layers::Layer, tensor::random::seeded_rng};

    #[test]
    fn test_raw_layout_without_header() {
        let params = [1.5f32, -2., 0.25];
        let mut buf = Vec::new();
        write_weights(&mut buf, &params).unwrap();

        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[..4], &1.5f32.to_ne_bytes());
        assert_eq!(read_weights(&mut Cursor::new(&buf), 3).unwrap(), params);
    }

    #[test]
    fn test_length_must_match_the_model() {
        let buf = vec![0u8; 10];
        let err = read_weights(&mut Cursor::new(&buf), 3).unwrap_err();
        assert!(matches!(
            err,
            RlErr::WeightsLength {
                got: 10,
                expected: 12
            }
        ));
    }

    #[test]
    fn test_save_then_load_into_a_fresh_model() {
        let mut model = Model::new([Layer::full(3, 2), Layer::relu(), Layer::full(2, 1)]);
        model.init(&mut seeded_rng(4, 0)).unwrap();

        let path = std::env::temp_dir().join(format!("deep_rl_weights_{}", std::process::id()));
        save_weights(&model, &path).unwrap();

        let mut loaded = Model::new([Layer::full(3, 2), Layer::relu(), Layer::full(2, 1)]);
        load_weights(&mut loaded, &path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(
            loaded.parameters().as_slice(),
            model.parameters().as_slice()
        );
    }
}
