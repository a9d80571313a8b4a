/// Opaque message payload
///
/// The bridge never looks inside a message: it is received from one
/// transport and handed, byte for byte, to the other.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Message {
    data: Vec<u8>,
}

impl Message {
    /// Wrap an owned payload
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }

    /// Copy a payload out of a borrowed slice
    pub fn from_slice(data: &[u8]) -> Self {
        Self {
            data: data.to_vec(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Take the payload back out
    pub fn into_vec(self) -> Vec<u8> {
        self.data
    }
}

impl From<Vec<u8>> for Message {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&[u8]> for Message {
    fn from(data: &[u8]) -> Self {
        Self::from_slice(data)
    }
}

impl AsRef<[u8]> for Message {
    fn as_ref(&self) -> &[u8] {
        &self.data
    }
}
