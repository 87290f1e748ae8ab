use swc_core::common::{
    comments::SingleThreadedComments, sync::Lrc, BytePos, LineCol, SourceMap,
};
use swc_core::ecma::ast::Module;
use swc_ecma_codegen::{text_writer::JsWriter, Emitter, Node};

use crate::error::EmitError;

#[derive(Debug, Clone, Copy, Default)]
pub struct EmitOptions {
    pub minify: bool,
    /// Collect the position map while printing
    pub positions: bool,
}

/// One entry of the position map: where a source byte ended up in the output
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Mapping {
    /// Byte offset in the original source
    pub source_offset: u32,
    /// 0-based line in the generated code
    pub generated_line: u32,
    /// 0-based column in the generated code
    pub generated_column: u32,
}

#[derive(Debug, Clone, Default)]
pub struct GeneratedCode {
    pub code: String,
    pub mappings: Vec<Mapping>,
}

/// Prints the module back to source text.
/// Nodes created by the transforms carry dummy spans and therefore have no mappings.
pub fn stringify_module(
    module: &Module,
    comments: Option<&SingleThreadedComments>,
    options: EmitOptions,
) -> Result<GeneratedCode, EmitError> {
    // Emitting the result requires some setup with SWC
    let cm: Lrc<SourceMap> = Default::default();
    let mut buff: Vec<u8> = Vec::with_capacity(1024);
    let mut raw_mappings: Vec<(BytePos, LineCol)> = Vec::new();

    {
        let writer = JsWriter::new(
            cm.clone(),
            "\n",
            &mut buff,
            if options.positions {
                Some(&mut raw_mappings)
            } else {
                None
            },
        );

        let mut emitter_cfg = swc_ecma_codegen::Config::default();
        emitter_cfg.minify = options.minify;

        let mut emitter = Emitter {
            cfg: emitter_cfg,
            comments: comments.map(|c| c as &dyn swc_core::common::comments::Comments),
            wr: writer,
            cm,
        };

        module.emit_with(&mut emitter)?;
    }

    let mappings = raw_mappings
        .into_iter()
        .filter(|(pos, _)| pos.0 != 0)
        .map(|(pos, line_col)| Mapping {
            source_offset: pos.0 - 1,
            generated_line: line_col.line,
            generated_column: line_col.col,
        })
        .collect();

    Ok(GeneratedCode {
        code: String::from_utf8(buff)?,
        mappings,
    })
}
