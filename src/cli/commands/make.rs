//! make connector - Generate files from templates
//!
//! A manifest maps each kind (`controller`, `model`, ...) to template
//! types, and each type to the files it generates:
//!
//! ```json
//! { "controller": { "basic": [
//!     { "file": "app/Http/Controllers/Request", "name": "%sController" }
//! ] } }
//! ```
//!
//! `file` names the template `<file>.php` and the output directory (its
//! parent). `name` is the output file stem with `%s` replaced by the
//! chosen name. Every `___<Suffix>___` placeholder in the templates of one
//! type is replaced with the file stem that carries that suffix, so
//! generated files can refer to each other.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _, Result};
use serde::de::{Deserializer, MapAccess, Visitor};
use serde::Deserialize;

use super::{require_expander, Connector, Context, Session};
use crate::cli::flags::Invocation;
use crate::core::fs::write_atomic;
use crate::doc::metadata::{MethodDoc, MethodTable};
use crate::doc::CommandMetadata;
use crate::prompt::field::{capitalize, PromptField, ValidationRule};
use crate::prompt::protocol::{FieldSet, PromptProtocol};

const METHODS: &[MethodDoc] = &[MethodDoc::documented(
    "make",
    "/**
      * Make file options
      * @methodExtends prompt
      * @return void
      */",
)];

const MANIFEST_FILE: &str = "make.json";

const BUILTIN_MANIFEST: &str = include_str!("../../../templates/make/make.json");
const BUILTIN_TEMPLATES: &[(&str, &str)] = &[
    (
        "app/Http/Controllers/Request",
        include_str!("../../../templates/make/app/Http/Controllers/Request.php"),
    ),
    (
        "app/Models/Request",
        include_str!("../../../templates/make/app/Models/Request.php"),
    ),
];

/// Name characters accepted for generated classes.
const NAME_CLASS: &str = "a-zA-Z_";

/// One generated file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TemplateFile {
    /// Template path without extension, relative to the template root.
    pub file: String,
    /// Output stem pattern; `%s` is the chosen name.
    pub name: String,
}

impl TemplateFile {
    /// Placeholder suffix: the pattern without `%s`, capitalised.
    pub fn suffix(&self) -> String {
        capitalize(self.name.replace("%s", "").trim())
    }

    /// Output file stem for `name`.
    pub fn stem(&self, name: &str) -> String {
        format!("{}{}", capitalize(name), self.suffix())
    }

    /// Output directory relative to the project root.
    pub fn directory(&self) -> &Path {
        Path::new(&self.file).parent().unwrap_or(Path::new(""))
    }
}

/// Kinds, their types and files, in manifest order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateManifest {
    kinds: Vec<(String, Vec<(String, Vec<TemplateFile>)>)>,
}

impl TemplateManifest {
    pub fn parse(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn kinds(&self) -> impl Iterator<Item = &str> {
        self.kinds.iter().map(|(k, _)| k.as_str())
    }

    /// Template type names of `kind`.
    pub fn types(&self, kind: &str) -> Vec<&str> {
        self.kind(kind)
            .map(|types| types.iter().map(|(t, _)| t.as_str()).collect())
            .unwrap_or_default()
    }

    pub fn files(&self, kind: &str, template_type: &str) -> Option<&[TemplateFile]> {
        self.kind(kind)?
            .iter()
            .find(|(t, _)| t == template_type)
            .map(|(_, files)| files.as_slice())
    }

    fn kind(&self, kind: &str) -> Option<&[(String, Vec<TemplateFile>)]> {
        self.kinds
            .iter()
            .find(|(k, _)| k == kind)
            .map(|(_, types)| types.as_slice())
    }
}

/// Map visitor that keeps document order.
struct Ordered<T>(Vec<(String, T)>);

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Ordered<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct OrderedVisitor<T>(std::marker::PhantomData<T>);

        impl<'de, T: Deserialize<'de>> Visitor<'de> for OrderedVisitor<T> {
            type Value = Ordered<T>;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map")
            }

            fn visit_map<M: MapAccess<'de>>(self, mut map: M) -> Result<Ordered<T>, M::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, T>()? {
                    entries.push(entry);
                }
                Ok(Ordered(entries))
            }
        }

        deserializer.deserialize_map(OrderedVisitor(std::marker::PhantomData))
    }
}

impl<'de> Deserialize<'de> for TemplateManifest {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let Ordered(kinds) = Ordered::<Ordered<Vec<TemplateFile>>>::deserialize(deserializer)?;
        Ok(Self {
            kinds: kinds
                .into_iter()
                .map(|(kind, Ordered(types))| (kind, types))
                .collect(),
        })
    }
}

/// Where templates are read from.
#[derive(Debug, Clone)]
enum TemplateSource {
    Builtin,
    Dir(PathBuf),
}

impl TemplateSource {
    fn manifest(&self) -> Result<TemplateManifest> {
        match self {
            TemplateSource::Builtin => {
                TemplateManifest::parse(BUILTIN_MANIFEST).context("Built-in make manifest is invalid")
            }
            TemplateSource::Dir(dir) => {
                let path = dir.join(MANIFEST_FILE);
                let json = fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                TemplateManifest::parse(&json)
                    .with_context(|| format!("Failed to parse {}", path.display()))
            }
        }
    }

    fn template(&self, file: &str) -> Result<String> {
        match self {
            TemplateSource::Builtin => BUILTIN_TEMPLATES
                .iter()
                .find(|(name, _)| *name == file)
                .map(|(_, contents)| contents.to_string())
                .with_context(|| format!("No built-in template \"{}\"", file)),
            TemplateSource::Dir(dir) => {
                let path = dir.join(format!("{}.php", file));
                fs::read_to_string(&path)
                    .with_context(|| format!("Failed to read template {}", path.display()))
            }
        }
    }
}

/// The `make` connector.
pub struct Make {
    table: MethodTable,
    protocol: PromptProtocol,
    manifest: TemplateManifest,
    source: TemplateSource,
}

impl Make {
    /// Load the manifest and register one prompt per kind.
    pub fn new(ctx: &Context) -> Result<Self> {
        let source = match ctx.paths.templates_dir() {
            Some(dir) => TemplateSource::Dir(dir.to_path_buf()),
            None => TemplateSource::Builtin,
        };
        let manifest = source.manifest()?;

        let mut protocol = PromptProtocol::new();
        for kind in manifest.kinds() {
            protocol.add_prompt(kind, Self::kind_fields(kind, &manifest.types(kind)));
        }
        tracing::debug!(kinds = protocol.len(), ?source, "loaded make templates");

        Ok(Self {
            table: MethodTable::new("Make", METHODS),
            protocol,
            manifest,
            source,
        })
    }

    fn kind_fields(kind: &str, types: &[&str]) -> FieldSet {
        FieldSet::new()
            .with(
                PromptField::text("name", &format!("Choose a {} name", kind))
                    .with_rule("length", [1, 60])
                    .with_error_fn(|rule| match rule {
                        "length" => "Required (1-60 characters)".to_string(),
                        _ => "No special characters (\"a-z\", \"A-Z\" and \"_\")".to_string(),
                    }),
            )
            .with(
                PromptField::select(
                    "type",
                    &format!("Choose a {} type", kind),
                    types.iter().map(|t| (*t, *t)),
                )
                .without_help(),
            )
    }

    pub fn run<R: BufRead, W: Write>(
        &self,
        ctx: &Context,
        session: &mut Session<'_, R, W>,
        invocation: &Invocation,
    ) -> Result<()> {
        let kind = match invocation.action() {
            None | Some("help") => {
                self.help(session.writer())?;
                return Ok(());
            }
            Some(kind) => kind,
        };
        let Some(fields) = self.protocol.get(kind) else {
            let kinds: Vec<_> = self.manifest.kinds().collect();
            session.failure(format!(
                "The kind \"{}\" does not exist. Choose one of: {}",
                kind,
                kinds.join(", ")
            ))?;
            return Ok(());
        };
        require_expander(self, "make")?;

        let title = format!("Installing {}", kind);
        let resolved = session
            .resolve(kind, &title, fields)
            .with_context(|| format!("The package \"{}\" is not configured correctly", kind))?;
        let Some(values) = resolved else {
            return Ok(());
        };

        let name = values.get("name").unwrap_or_default();
        let template_type = values.get("type").unwrap_or_default();
        self.check_name(session, fields, name)?;
        let Some(files) = self.manifest.files(kind, template_type) else {
            bail!("The type \"{}\" does not exist for {}", template_type, kind);
        };

        let created = self.generate(ctx, session, files, name)?;
        session.message("")?;
        if created.is_empty() {
            return session.message("No files were added");
        }
        for path in created {
            session.message(format!("File created: {}", path.display()))?;
        }
        Ok(())
    }

    /// Check a name supplied as a flag against every name rule.
    fn check_name<R: BufRead, W: Write>(
        &self,
        session: &mut Session<'_, R, W>,
        fields: &FieldSet,
        name: &str,
    ) -> Result<()> {
        let Some(field) = fields.get("name") else {
            return Ok(());
        };
        let rules = [
            ValidationRule::new("length", [1, 60]),
            ValidationRule::new("pregMatch", [NAME_CLASS]),
        ];
        for rule in &rules {
            if !session.input().validators().check(name, Some(rule))? {
                let message = field
                    .failure_message(&rule.name)
                    .unwrap_or_else(|| format!("Invalid name \"{}\"", name));
                bail!(message);
            }
        }
        Ok(())
    }

    /// Write every file of one template type. Returns the written paths.
    fn generate<R: BufRead, W: Write>(
        &self,
        ctx: &Context,
        session: &mut Session<'_, R, W>,
        files: &[TemplateFile],
        name: &str,
    ) -> Result<Vec<PathBuf>> {
        let replacements: HashMap<String, String> = files
            .iter()
            .map(|f| (format!("___{}___", f.suffix()), f.stem(name)))
            .collect();

        let mut created = Vec::new();
        for file in files {
            let target = ctx
                .paths
                .root()
                .join(file.directory())
                .join(format!("{}.php", file.stem(name)));

            if target.exists() {
                let question = format!(
                    "File exists: {}\nDo you want to overwrite?",
                    target.display()
                );
                if !session.confirmed(&question)? {
                    continue;
                }
            }

            let mut contents = self.source.template(&file.file)?;
            for (placeholder, stem) in &replacements {
                contents = contents.replace(placeholder, stem);
            }
            write_atomic(&target, contents.as_bytes())?;
            tracing::info!(path = %target.display(), "generated file");
            created.push(target);
        }
        Ok(created)
    }
}

impl Connector for Make {
    fn name(&self) -> &'static str {
        "make"
    }

    fn metadata(&self) -> &dyn CommandMetadata {
        &self.table
    }

    fn protocol(&self) -> &PromptProtocol {
        &self.protocol
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::{Config, ProjectConfig};
    use crate::core::paths::ProjectPaths;
    use crate::ui::prompts::InteractiveInput;
    use std::io::Cursor;
    use tempfile::TempDir;

    fn context(temp: &TempDir, config: Config) -> Context {
        Context::new(ProjectPaths::new(temp.path().to_path_buf(), &config), config)
    }

    fn run(ctx: &Context, tokens: &[&str], lines: &[&str]) -> (Result<()>, String) {
        let mut script = lines.join("\n");
        script.push('\n');
        let mut input = InteractiveInput::new(Cursor::new(script.into_bytes()), Vec::new());
        let invocation = crate::cli::flags::parse(tokens);

        let result = Make::new(ctx).and_then(|make| {
            let mut session = Session::new(ctx, &mut input, invocation.flags.clone());
            make.run(ctx, &mut session, &invocation)
        });
        let (_, out) = input.into_parts();
        (result, String::from_utf8(out).unwrap())
    }

    #[test]
    fn builtin_manifest_keeps_order() {
        let manifest = TemplateManifest::parse(BUILTIN_MANIFEST).unwrap();
        assert_eq!(manifest.kinds().collect::<Vec<_>>(), vec!["controller", "model"]);
        assert_eq!(manifest.types("controller"), vec!["basic"]);
        assert_eq!(manifest.files("controller", "basic").unwrap().len(), 2);
        assert!(manifest.files("controller", "rest").is_none());
        for (_, files) in &manifest.kinds[0].1 {
            for file in files {
                assert!(BUILTIN_TEMPLATES.iter().any(|(name, _)| *name == file.file));
            }
        }
    }

    #[test]
    fn suffix_and_stem() {
        let file = TemplateFile {
            file: "app/Models/Request".into(),
            name: "%s RequestModel ".into(),
        };
        assert_eq!(file.suffix(), "RequestModel");
        assert_eq!(file.stem("user"), "UserRequestModel");
        assert_eq!(file.directory(), Path::new("app/Models"));
    }

    #[test]
    fn kinds_are_registered_as_prompts() {
        let temp = TempDir::new().unwrap();
        let make = Make::new(&context(&temp, Config::default())).unwrap();
        assert_eq!(make.protocol().names().collect::<Vec<_>>(), vec!["controller", "model"]);
        assert!(make.check().is_ok());

        let help = crate::ui::help::HelpRenderer::new(make.metadata(), make.protocol())
            .render_to_string()
            .unwrap();
        assert!(help.contains("make:controller"));
        assert!(help.contains("--name"));
        assert!(!help.contains("--type"));
    }

    #[test]
    fn controller_generates_linked_files() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, Config::default());
        let (result, out) = run(&ctx, &["controller", "--name=user", "--type=basic"], &[]);
        result.unwrap();

        let controller = temp.path().join("app/Http/Controllers/UserController.php");
        let model = temp.path().join("app/Models/UserRequestModel.php");
        let source = fs::read_to_string(&controller).unwrap();
        assert!(source.contains("class UserController extends"));
        assert!(source.contains("UserRequestModel $form"));
        assert!(!source.contains("___"));
        assert!(fs::read_to_string(model).unwrap().contains("class UserRequestModel"));
        assert!(out.contains("File created:"));
    }

    #[test]
    fn prompts_for_name_and_type() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, Config::default());
        let (result, out) = run(&ctx, &["model"], &["", "Invoice", "basic"]);
        result.unwrap();

        assert!(out.starts_with("Installing model\n"));
        assert!(out.contains("Required (1-60 characters)"));
        assert!(out.contains("Choose a model type:\nbasic: basic\n"));
        assert!(temp.path().join("app/Models/InvoiceRequestModel.php").exists());
    }

    #[test]
    fn flag_name_with_special_characters_is_rejected() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, Config::default());
        let (result, _) = run(&ctx, &["model", "--name=in-voice", "--type=basic"], &[]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("No special characters"));
        assert!(!temp.path().join("app").exists());
    }

    #[test]
    fn existing_file_is_kept_when_declined() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, Config::default());
        let model = temp.path().join("app/Models/UserRequestModel.php");
        fs::create_dir_all(model.parent().unwrap()).unwrap();
        fs::write(&model, "custom").unwrap();

        let (result, out) = run(&ctx, &["model", "--name=user", "--type=basic"], &["no"]);
        result.unwrap();
        assert!(out.contains("Do you want to overwrite?"));
        assert!(out.contains("No files were added"));
        assert_eq!(fs::read_to_string(&model).unwrap(), "custom");
    }

    #[test]
    fn templates_dir_overrides_builtin() {
        let temp = TempDir::new().unwrap();
        let templates = temp.path().join("stubs");
        fs::create_dir_all(templates.join("src")).unwrap();
        fs::write(
            templates.join("make.json"),
            r#"{ "job": { "queued": [ { "file": "src/Job", "name": "%sJob" } ] } }"#,
        )
        .unwrap();
        fs::write(templates.join("src/Job.php"), "class ___Job___ {}\n").unwrap();

        let project = ProjectConfig {
            templates_dir: Some("stubs".into()),
            ..Default::default()
        };
        let ctx = context(&temp, Config::with_project(project));
        let (result, _) = run(&ctx, &["job", "--name=send_mail", "--type=queued"], &[]);
        result.unwrap();

        let job = fs::read_to_string(temp.path().join("src/Send_mailJob.php")).unwrap();
        assert_eq!(job, "class Send_mailJob {}\n");
    }

    #[test]
    fn unknown_kind_lists_kinds() {
        let temp = TempDir::new().unwrap();
        let ctx = context(&temp, Config::default());
        let (result, out) = run(&ctx, &["view"], &[]);
        result.unwrap();
        assert!(out.contains("Choose one of: controller, model"));
    }
}
