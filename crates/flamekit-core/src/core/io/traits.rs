use std::error::Error;
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Defines the interface for producing lattice text.
///
/// Implementors build the complete text in memory first; the provided writers
/// only emit it once rendering has succeeded, so a failed render never leaves a
/// half-written file behind.
pub trait LatticeRender {
    /// The error type for rendering and I/O operations.
    type Error: Error + From<io::Error>;

    /// Renders the full lattice text.
    ///
    /// # Errors
    ///
    /// Returns an error if the lattice cannot be rendered.
    fn render(&self) -> Result<String, Self::Error>;

    /// Renders and writes the lattice text to `writer`.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering or writing fails.
    fn write_to(&self, writer: &mut impl Write) -> Result<(), Self::Error> {
        let text = self.render()?;
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Renders the lattice text and writes it to a file at `path`.
    ///
    /// The file is only created after rendering succeeded.
    ///
    /// # Errors
    ///
    /// Returns an error if rendering fails, or the file cannot be created or written.
    fn write_to_path<P: AsRef<Path>>(&self, path: P) -> Result<(), Self::Error> {
        let text = self.render()?;
        let file = File::create(path)?;
        let mut writer = BufWriter::new(file);
        writer.write_all(text.as_bytes())?;
        writer.flush()?;
        Ok(())
    }
}
