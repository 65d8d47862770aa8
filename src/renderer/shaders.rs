use std::collections::{HashMap, HashSet};

use crate::error::ShaderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ShaderStage {
    Vertex,
    Fragment,
}

/// One compiled-ready WGSL stage.
#[derive(Debug, Clone)]
pub struct ShaderEntry {
    pub name: String,
    pub stage: ShaderStage,
    pub entry_point: &'static str,
    pub source: String,
}

const COMMON: &str = include_str!("../shader/common.wgsl");
const TEXTURES: &str = include_str!("../shader/textures.wgsl");
const SKINNING: &str = include_str!("../shader/skinning.wgsl");
const DEFAULT: &str = include_str!("../shader/default.wgsl");
const SHADOW: &str = include_str!("../shader/shadow.wgsl");
const SKY: &str = include_str!("../shader/sky.wgsl");
const DEBUG: &str = include_str!("../shader/debug.wgsl");

/// WGSL stages keyed by purpose name ("standardVS", "opaquePS", ...).
#[derive(Default)]
pub struct ShaderLibrary {
    shaders: HashMap<String, ShaderEntry>,
}

impl ShaderLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every stage the frame pipelines reference.
    pub fn standard() -> Result<Self, ShaderError> {
        use ShaderStage::{Fragment, Vertex};

        let lit = [COMMON, TEXTURES, SKINNING, DEFAULT].join("\n");
        let shadow = [COMMON, SKINNING, SHADOW].join("\n");
        let sky = [COMMON, TEXTURES, SKINNING, SKY].join("\n");
        let debug = [COMMON, TEXTURES, SKINNING, DEBUG].join("\n");

        let mut library = Self::new();
        library.register("standardVS", Vertex, "vs_main", &lit, &["FOG"])?;
        library.register("skinnedVS", Vertex, "vs_main", &lit, &["FOG", "SKINNED"])?;
        library.register("opaquePS", Fragment, "fs_main", &lit, &["FOG"])?;
        library.register("alphaTestedPS", Fragment, "fs_main", &lit, &["FOG", "ALPHA_TEST"])?;
        library.register("shadowVS", Vertex, "vs_main", &shadow, &[])?;
        library.register("skinnedShadowVS", Vertex, "vs_main", &shadow, &["SKINNED"])?;
        library.register("skyVS", Vertex, "vs_main", &sky, &[])?;
        library.register("skyPS", Fragment, "fs_main", &sky, &[])?;
        library.register("debugVS", Vertex, "vs_main", &debug, &[])?;
        library.register("debugPS", Fragment, "fs_main", &debug, &[])?;

        log::info!("Shader library ready: {} stages", library.len());
        Ok(library)
    }

    pub fn register(
        &mut self,
        name: &str,
        stage: ShaderStage,
        entry_point: &'static str,
        template: &str,
        defines: &[&str],
    ) -> Result<(), ShaderError> {
        let source = preprocess(name, template, defines)?;
        self.shaders.insert(
            name.to_string(),
            ShaderEntry {
                name: name.to_string(),
                stage,
                entry_point,
                source,
            },
        );
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&ShaderEntry> {
        self.shaders.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.shaders.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.shaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shaders.is_empty()
    }
}

struct Block {
    parent_active: bool,
    taking: bool,
    seen_else: bool,
}

/// Resolves `#ifdef`/`#ifndef`/`#else`/`#endif`. Skipped lines become blank so
/// compiler line numbers still match the template.
pub fn preprocess(shader: &str, template: &str, defines: &[&str]) -> Result<String, ShaderError> {
    let defined: HashSet<&str> = defines.iter().copied().collect();
    let mut stack: Vec<Block> = Vec::new();
    let mut output = String::with_capacity(template.len());

    for (number, line) in template.lines().enumerate() {
        let line_no = number + 1;
        let trimmed = line.trim_start();
        let active = stack.last().map_or(true, |b| b.parent_active && b.taking);

        let mut words = trimmed.split_whitespace();
        let directive = words.next().unwrap_or("");
        match directive {
            "#ifdef" | "#ifndef" => {
                let name = words.next().ok_or_else(|| ShaderError::MissingDefineName {
                    shader: shader.to_string(),
                    line: line_no,
                })?;
                let present = defined.contains(name);
                stack.push(Block {
                    parent_active: active,
                    taking: if directive == "#ifdef" { present } else { !present },
                    seen_else: false,
                });
            }
            "#else" => match stack.last_mut() {
                Some(block) if !block.seen_else => {
                    block.taking = !block.taking;
                    block.seen_else = true;
                }
                _ => {
                    return Err(ShaderError::UnbalancedDirective {
                        shader: shader.to_string(),
                        line: line_no,
                        directive: directive.to_string(),
                    })
                }
            },
            "#endif" => {
                if stack.pop().is_none() {
                    return Err(ShaderError::UnbalancedDirective {
                        shader: shader.to_string(),
                        line: line_no,
                        directive: directive.to_string(),
                    });
                }
            }
            _ if active => output.push_str(line),
            _ => {}
        }
        output.push('\n');
    }

    if !stack.is_empty() {
        return Err(ShaderError::UnterminatedBlock {
            shader: shader.to_string(),
            open: stack.len(),
        });
    }

    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "a\n#ifdef FOG\nfog\n#else\nclear\n#endif\n#ifndef SKINNED\nrigid\n#endif\nz";

    #[test]
    fn defines_select_branches() {
        let fog = preprocess("t", TEMPLATE, &["FOG"]).unwrap();
        assert!(fog.contains("fog") && !fog.contains("clear") && fog.contains("rigid"));

        let plain = preprocess("t", TEMPLATE, &["SKINNED"]).unwrap();
        assert!(plain.contains("clear") && !plain.contains("rigid"));
        assert_eq!(plain.lines().count(), TEMPLATE.lines().count());
    }

    #[test]
    fn nested_blocks_respect_outer_state() {
        let template = "#ifdef A\n#ifdef B\nboth\n#endif\n#else\n#ifdef B\nonly_b\n#endif\n#endif";
        let out = preprocess("t", template, &["B"]).unwrap();
        assert!(out.contains("only_b"));
        assert!(!out.contains("both"));
    }

    #[test]
    fn unbalanced_directives_are_errors() {
        assert!(matches!(
            preprocess("t", "#endif", &[]),
            Err(ShaderError::UnbalancedDirective { line: 1, .. })
        ));
        assert!(matches!(
            preprocess("t", "#ifdef A\nx", &[]),
            Err(ShaderError::UnterminatedBlock { open: 1, .. })
        ));
        assert!(matches!(
            preprocess("t", "#ifdef\n#endif", &[]),
            Err(ShaderError::MissingDefineName { .. })
        ));
    }

    #[test]
    fn standard_library_covers_every_pipeline_stage() {
        let library = ShaderLibrary::standard().unwrap();
        for kind in crate::renderer::pipeline::PipelineKind::ALL {
            let desc = kind.desc();
            assert_eq!(
                library.get(desc.vertex_shader).map(|s| s.stage),
                Some(ShaderStage::Vertex)
            );
            if let Some(fs) = desc.fragment_shader {
                assert_eq!(library.get(fs).map(|s| s.stage), Some(ShaderStage::Fragment));
            }
        }
    }

    #[test]
    fn skinned_variant_declares_bone_inputs() {
        let library = ShaderLibrary::standard().unwrap();
        assert!(library.get("skinnedVS").unwrap().source.contains("bone_indices"));
        assert!(!library.get("standardVS").unwrap().source.contains("@location(5)"));
        assert!(library.get("alphaTestedPS").unwrap().source.contains("discard"));
        assert!(!library.get("opaquePS").unwrap().source.contains("discard"));
    }
}
