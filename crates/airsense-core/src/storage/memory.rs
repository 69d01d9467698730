use heapless::Vec;
use thiserror_no_std::Error;

use super::TextResource;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemoryResourceError {
    #[error("Contents of {len} bytes exceed the {capacity} byte capacity")]
    Capacity { len: usize, capacity: usize },
}

/// RAM-backed text resource of fixed capacity.
///
/// Starts out absent. Contents do not survive a reset, so this stands in
/// for storage in tests and on boards without a card.
#[derive(Debug, Clone, Default)]
pub struct MemoryResource<const N: usize> {
    contents: Option<Vec<u8, N>>,
}

impl<const N: usize> MemoryResource<N> {
    pub const fn new() -> Self {
        Self { contents: None }
    }

    pub fn with_contents(contents: &[u8]) -> Result<Self, MemoryResourceError> {
        let mut resource = Self::new();
        resource.overwrite(contents)?;
        Ok(resource)
    }

    pub fn contents(&self) -> Option<&[u8]> {
        self.contents.as_deref()
    }

    pub fn clear(&mut self) {
        self.contents = None;
    }
}

impl<const N: usize> TextResource for MemoryResource<N> {
    type Error = MemoryResourceError;

    fn read(&mut self, buffer: &mut [u8]) -> Result<Option<usize>, Self::Error> {
        let Some(contents) = &self.contents else {
            return Ok(None);
        };
        let copied = contents.len().min(buffer.len());
        buffer[..copied].copy_from_slice(&contents[..copied]);
        Ok(Some(contents.len()))
    }

    fn overwrite(&mut self, contents: &[u8]) -> Result<(), Self::Error> {
        let stored = Vec::from_slice(contents).map_err(|_| MemoryResourceError::Capacity {
            len: contents.len(),
            capacity: N,
        })?;
        self.contents = Some(stored);
        Ok(())
    }
}
