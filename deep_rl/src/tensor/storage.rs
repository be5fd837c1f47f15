use bytemuck::{Pod, Zeroable};

/// Amount of `f32`s processed per vector instruction on the fast paths.
pub const LANES: usize = 8;

/// Byte alignment guaranteed for every owning allocation.
pub const ALIGNMENT: usize = LANES * size_of::<f32>();

#[derive(Debug, Clone, Copy, Pod, Zeroable)]
#[repr(C, align(32))]
struct Lane([f32; LANES]);

/// Where the memory of a buffer lives.
///
/// Device buffers are accepted and tagged, but allocation and compute always happen on the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Locality {
    #[default]
    Host,
    Device,
}

/// A heap buffer of `f32`s whose start is aligned to [`ALIGNMENT`] bytes.
#[derive(Debug, Clone)]
pub struct AlignedBuf {
    lanes: Vec<Lane>,
    len: usize,
}

impl AlignedBuf {
    /// Allocates `len` zeroed floats.
    pub fn zeros(len: usize) -> Self {
        Self {
            lanes: vec![Lane::zeroed(); len.div_ceil(LANES)],
            len,
        }
    }

    /// Allocates a copy of `data`.
    pub fn from_slice(data: &[f32]) -> Self {
        let mut buf = Self::zeros(data.len());
        buf.as_mut_slice().copy_from_slice(data);
        buf
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn as_slice(&self) -> &[f32] {
        &bytemuck::cast_slice(&self.lanes)[..self.len]
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        &mut bytemuck::cast_slice_mut(&mut self.lanes)[..self.len]
    }
}

/// The memory behind a tensor: either owned by it or borrowed from someone else.
///
/// A borrowed storage can never outlive the buffer it points into.
#[derive(Debug)]
pub enum Storage<'a> {
    Owned(AlignedBuf),
    Borrowed(&'a mut [f32]),
}

impl Storage<'_> {
    pub fn as_slice(&self) -> &[f32] {
        match self {
            Storage::Owned(buf) => buf.as_slice(),
            Storage::Borrowed(data) => data,
        }
    }

    pub fn as_mut_slice(&mut self) -> &mut [f32] {
        match self {
            Storage::Owned(buf) => buf.as_mut_slice(),
            Storage::Borrowed(data) => data,
        }
    }

    pub fn is_owned(&self) -> bool {
        matches!(self, Storage::Owned(_))
    }
}

/// Returns whether `data` starts on an [`ALIGNMENT`] byte boundary.
pub fn is_aligned(data: &[f32]) -> bool {
    data.as_ptr() as usize % ALIGNMENT == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_owned_allocations_are_aligned() {
        for len in [0, 1, 7, 8, 9, 63, 64, 1000] {
            let buf = AlignedBuf::zeros(len);
            assert_eq!(buf.len(), len);
            assert!(is_aligned(buf.as_slice()), "len {len} is not aligned");
        }
    }

    #[test]
    fn test_from_slice_copies_exact_length() {
        let data = [1., 2., 3., 4., 5., 6., 7., 8., 9., 10.];
        let buf = AlignedBuf::from_slice(&data);
        assert_eq!(buf.as_slice(), &data);
    }

    #[test]
    fn test_offset_slices_lose_alignment() {
        let buf = AlignedBuf::zeros(16);
        assert!(!is_aligned(&buf.as_slice()[1..]));
        assert!(is_aligned(&buf.as_slice()[8..]));
    }
}
