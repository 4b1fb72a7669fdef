use crate::base::VInt64;
use crate::element::Element;
use crate::functional::*;

/// EBML Void element (0xEC): padding that carries no meaning, permitted anywhere.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Void {
    /// Size of the void element's body in bytes.
    pub size: u64,
}
impl Element for Void {
    const ID: VInt64 = VInt64::from_encoded(0xEC);
    fn decode_body(buf: &mut &[u8]) -> crate::Result<Self> {
        let len = buf.len() as u64;
        buf.advance(buf.len());
        Ok(Self { size: len })
    }
    fn encode_body<B: BufMut>(&self, buf: &mut B) -> crate::Result<()> {
        buf.append_slice(&vec![0; self.size as usize]);
        Ok(())
    }
}
