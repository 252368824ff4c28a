//! Compilation options.

/// Options controlling module lowering.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    /// Library that body-less declarations resolve against by name.
    pub native_library: String,
    /// Name of the function to record as the module entry point.
    pub entry_symbol: String,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            native_library: "ucrtbase".to_string(),
            entry_symbol: "main".to_string(),
        }
    }
}

impl CompileOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the native library external declarations resolve against.
    pub fn with_native_library(mut self, library: impl Into<String>) -> Self {
        self.native_library = library.into();
        self
    }

    /// Set the entry point symbol name.
    pub fn with_entry_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.entry_symbol = symbol.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let options = CompileOptions::default();
        assert_eq!(options.native_library, "ucrtbase");
        assert_eq!(options.entry_symbol, "main");
    }

    #[test]
    fn builders_override() {
        let options = CompileOptions::new()
            .with_native_library("libc")
            .with_entry_symbol("start");
        assert_eq!(options.native_library, "libc");
        assert_eq!(options.entry_symbol, "start");
    }
}
