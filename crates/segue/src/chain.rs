use std::io::{self, Read};

/// Joins the byte streams yielded by `supplier` into a single forward-only
/// reader.
///
/// The supplier is pulled lazily: a new stream is requested only once the
/// current one reports end of data, and the chain ends when the supplier runs
/// out. Reads never span two underlying streams.
pub struct ChainedStream<I, R> {
    supplier: Option<I>,
    current: Option<R>,
}

impl<I, R> ChainedStream<I, R>
where
    I: Iterator<Item = io::Result<R>>,
    R: Read,
{
    pub fn new(supplier: I) -> Self {
        Self {
            supplier: Some(supplier),
            current: None,
        }
    }

    /// Whether a stream is currently open.
    pub fn is_reading(&self) -> bool {
        self.current.is_some()
    }

    /// Drops the open stream and the supplier. Further reads report end of data.
    pub fn close(&mut self) {
        self.current = None;
        self.supplier = None;
    }

    fn advance(&mut self) -> io::Result<bool> {
        let Some(supplier) = self.supplier.as_mut() else {
            return Ok(false);
        };

        match supplier.next() {
            Some(Ok(stream)) => {
                self.current = Some(stream);
                Ok(true)
            }
            Some(Err(e)) => {
                // the supplier has moved past the failed stream
                self.supplier = None;
                Err(e)
            }
            None => {
                self.supplier = None;
                Ok(false)
            }
        }
    }
}

impl<I, R> Read for ChainedStream<I, R>
where
    I: Iterator<Item = io::Result<R>>,
    R: Read,
{
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }

        loop {
            if self.current.is_none() && !self.advance()? {
                return Ok(0);
            }

            let Some(current) = self.current.as_mut() else {
                return Ok(0);
            };
            match current.read(buf)? {
                0 => self.current = None,
                read => return Ok(read),
            }
        }
    }
}
