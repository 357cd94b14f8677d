//! Compilation options

/// Options for one compilation
#[derive(Debug, Clone)]
pub struct CodegenOptions {
    /// Module identifier written at the top of the output
    pub module_name: String,
    /// Capacity of the buffer a `read` into a string scans into
    pub read_buffer_len: usize,
    /// Turn soft conditions into fatal errors
    pub warnings_as_errors: bool,
}

impl Default for CodegenOptions {
    fn default() -> Self {
        Self {
            module_name: "main".to_string(),
            read_buffer_len: 100,
            warnings_as_errors: false,
        }
    }
}

impl CodegenOptions {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module_name: module_name.into(),
            ..Self::default()
        }
    }

    /// scanf format for string reads, bounded by the buffer capacity
    pub fn read_format(&self) -> String {
        format!("%{}s", self.read_buffer_len)
    }
}
