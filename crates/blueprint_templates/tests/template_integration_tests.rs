//! Integration tests for template system.

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use blueprint_templates::{
    ChainResolver, CollisionPolicy, Context, DirSource, EngineConfig, MemorySource, Resolver,
    SourceResolver, Stage, TemplateEngine, TemplateError, TemplateRef, TemplateType,
};
use tempfile::tempdir;

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// A go-api project including a default-on logging feature and an opt-in
/// metrics feature, which itself includes a prometheus component.
fn setup_templates(root: &Path) {
    write(
        root,
        "projects/go-api/template.yaml",
        r#"
name: go-api
type: project
version: "1.0.0"
description: Go API
variables:
  - name: project_name
    prompt: Project name
    type: string
    role: project_name
    default: my-api
  - name: module
    prompt: Go module path
    type: string
includes:
  - template: features/logging
    enabled_by_default: true
  - template: features/metrics
dependencies: ["github.com/go-chi/chi@v5"]
files:
  - src: files
    dest: "{{ .project_name }}"
post_init:
  - command: go mod tidy
    workdir: "{{ .project_name }}"
"#,
    );
    write(
        root,
        "projects/go-api/files/go.mod.tmpl",
        "module {{ .module | default \"example.com/app\" }}\n",
    );
    write(root, "projects/go-api/files/.gitignore", "bin/\n{{ not rendered }}\n");
    write(
        root,
        "projects/go-api/files/cmd/{{ .project_name }}/main.go.tmpl",
        "package main // {{ .project_name | snakeCase }}\n",
    );

    write(
        root,
        "features/logging/template.yaml",
        r#"
name: logging
type: feature
version: "1.0.0"
variables:
  - name: log_level
    prompt: Log level
    type: select
    options: [debug, info, warn]
    default: info
dependencies: ["go.uber.org/zap@v1.26.0", "github.com/go-chi/chi"]
files:
  - src: log.go.tmpl
    dest: "{{ .project_name }}/internal/log/log.go.tmpl"
post_init:
  - command: go get go.uber.org/zap
"#,
    );
    write(
        root,
        "features/logging/log.go.tmpl",
        "package log\n\nconst Level = \"{{ .log_level }}\"\n",
    );

    write(
        root,
        "features/metrics/template.yml",
        r#"
name: metrics
type: feature
version: "1.0.0"
includes:
  - template: components/prometheus
files:
  - src: metrics.go
    dest: "{{ .project_name }}/internal/metrics/metrics.go"
"#,
    );
    write(root, "features/metrics/metrics.go", "package metrics\n");

    write(
        root,
        "components/prometheus/template.yaml",
        r#"
name: prometheus
type: component
version: "0.1.0"
dependencies: ["github.com/prometheus/client_golang"]
files:
  - src: prometheus.yml
    dest: "{{ .project_name }}/prometheus.yml"
"#,
    );
    write(root, "components/prometheus/prometheus.yml", "scrape_configs: []\n");
}

fn context() -> Context {
    Context::from_json(r#"{"project_name": "MyApi", "module": "github.com/acme/myapi", "log_level": "debug"}"#)
        .unwrap()
}

fn read(files: &blueprint_templates::RenderedFiles, path: &str) -> String {
    String::from_utf8(files[Path::new(path)].clone()).unwrap()
}

#[test]
fn test_process_composes_every_include() {
    let temp = tempdir().unwrap();
    setup_templates(temp.path());
    let engine = TemplateEngine::from_dir(temp.path());

    let files = engine.process("projects/go-api", &context()).unwrap();
    let paths: Vec<_> = files.keys().map(|p| p.to_string_lossy().into_owned()).collect();
    assert_eq!(
        paths,
        vec![
            "MyApi/.gitignore",
            "MyApi/cmd/MyApi/main.go",
            "MyApi/go.mod",
            "MyApi/internal/log/log.go",
            "MyApi/internal/metrics/metrics.go",
            "MyApi/prometheus.yml",
        ]
    );
    assert_eq!(read(&files, "MyApi/go.mod"), "module github.com/acme/myapi\n");
    assert_eq!(
        read(&files, "MyApi/cmd/MyApi/main.go"),
        "package main // my_api\n"
    );
    assert_eq!(
        read(&files, "MyApi/.gitignore"),
        "bin/\n{{ not rendered }}\n"
    );
    assert!(read(&files, "MyApi/internal/log/log.go").contains("\"debug\""));
}

#[test]
fn test_process_with_selected_includes() {
    let temp = tempdir().unwrap();
    setup_templates(temp.path());
    let engine = TemplateEngine::from_dir(temp.path());

    let enabled = HashMap::from([("features/metrics".to_string(), true)]);
    let files = engine
        .process_with_includes("projects/go-api", &context(), &enabled)
        .unwrap();
    assert!(files.contains_key(Path::new("MyApi/internal/log/log.go")));
    assert!(files.contains_key(Path::new("MyApi/internal/metrics/metrics.go")));
    assert!(files.contains_key(Path::new("MyApi/prometheus.yml")));

    let enabled = HashMap::from([("features/logging".to_string(), false)]);
    let files = engine
        .process_with_includes("projects/go-api", &context(), &enabled)
        .unwrap();
    assert_eq!(files.len(), 3);
}

#[test]
fn test_composed_template_merges_includes() {
    let temp = tempdir().unwrap();
    setup_templates(temp.path());
    let engine = TemplateEngine::from_dir(temp.path());

    let template = engine.load("projects/go-api").unwrap();
    let enabled = HashMap::from([("features/metrics".to_string(), true)]);
    let composed = engine
        .compose_with_enabled_includes(&template, &enabled)
        .unwrap();

    let names: Vec<_> = composed.variables.iter().map(|v| v.name.as_str()).collect();
    assert_eq!(names, vec!["project_name", "module", "log_level"]);
    assert_eq!(
        composed.dependencies,
        vec![
            "github.com/go-chi/chi@v5",
            "github.com/prometheus/client_golang",
            "go.uber.org/zap@v1.26.0",
        ]
    );
    let commands: Vec<_> = composed.post_init.iter().map(|p| p.command.as_str()).collect();
    assert_eq!(commands, vec!["go mod tidy", "go get go.uber.org/zap"]);
    assert!(composed.includes.is_empty());
}

#[test]
fn test_get_all_includes_lists_nested() {
    let temp = tempdir().unwrap();
    setup_templates(temp.path());
    let engine = TemplateEngine::from_dir(temp.path());

    let template = engine.load("projects/go-api").unwrap();
    let includes = engine.get_all_includes(&template).unwrap();
    let names: Vec<_> = includes.iter().map(|i| i.template.as_str()).collect();
    assert_eq!(
        names,
        vec!["features/logging", "features/metrics", "components/prometheus"]
    );
}

#[test]
fn test_cycle_between_directories() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write(
        root,
        "features/a/template.yaml",
        "name: a\ntype: feature\nversion: \"1\"\nincludes: [{template: features/b}]\nfiles: [{src: x, dest: x}]\n",
    );
    write(
        root,
        "features/b/template.yaml",
        "name: b\ntype: feature\nversion: \"1\"\nincludes: [{template: ./features/a/template.yaml}]\nfiles: [{src: y, dest: y}]\n",
    );
    let engine = TemplateEngine::from_dir(root);

    let err = engine
        .composed_template("features/a")
        .unwrap_err();
    assert!(err.to_string().starts_with("failed to compose template"));
    match err.root_cause() {
        TemplateError::CircularDependency { path } => {
            assert_eq!(path, &vec!["features/a", "features/b", "features/a"]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
}

#[test]
fn test_empty_name_fails_at_load() {
    let temp = tempdir().unwrap();
    write(
        temp.path(),
        "projects/bad/template.yaml",
        "name: \"\"\ntype: project\nversion: \"1\"\nfiles: [{src: a, dest: a}]\n",
    );
    let engine = TemplateEngine::from_dir(temp.path());
    let err = engine.process("projects/bad", &Context::new()).unwrap_err();
    assert!(matches!(
        err,
        TemplateError::Stage {
            stage: Stage::Load,
            ..
        }
    ));
    assert!(matches!(err.root_cause(), TemplateError::Validation { .. }));
}

#[test]
fn test_parse_error_produces_no_output() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write(
        root,
        "features/f/template.yaml",
        "name: f\ntype: feature\nversion: \"1\"\nfiles: [{src: files, dest: out}]\n",
    );
    write(root, "features/f/files/a.txt.tmpl", "{{ .name }}");
    write(root, "features/f/files/b.txt.tmpl", "{{ range .items }}");
    let engine = TemplateEngine::from_dir(root);

    let err = engine.process("features/f", &Context::new()).unwrap_err();
    assert!(err.to_string().starts_with("failed to render template"));
    assert!(matches!(err.root_cause(), TemplateError::Syntax(_)));
}

#[test]
fn test_collision_policy_from_config() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write(
        root,
        "features/f/template.yaml",
        "name: f\ntype: feature\nversion: \"1\"\nfiles:\n  - {src: one.txt, dest: out.txt}\n  - {src: two.txt, dest: \"{{ .name }}\"}\n",
    );
    write(root, "features/f/one.txt", "one");
    write(root, "features/f/two.txt", "two");
    let ctx = Context::new().with("name", "out.txt");

    let err = TemplateEngine::from_dir(root)
        .process("features/f", &ctx)
        .unwrap_err();
    assert!(matches!(err.root_cause(), TemplateError::Collision { .. }));

    let config = EngineConfig::from_yaml_str("collision: overwrite").unwrap();
    assert_eq!(config.collision, CollisionPolicy::Overwrite);
    let files = TemplateEngine::from_dir(root)
        .with_config(config)
        .process("features/f", &ctx)
        .unwrap();
    assert_eq!(read(&files, "out.txt"), "two");
}

#[test]
fn test_discover_skips_broken_templates() {
    let temp = tempdir().unwrap();
    setup_templates(temp.path());
    write(temp.path(), "features/broken/template.yaml", "name: [unclosed");
    let engine = TemplateEngine::from_dir(temp.path());

    let mut found: Vec<_> = engine.discover().collect();
    found.sort();
    assert_eq!(
        found,
        vec![
            ("components/prometheus".to_string(), "prometheus".to_string()),
            ("features/logging".to_string(), "logging".to_string()),
            ("features/metrics".to_string(), "metrics".to_string()),
            ("projects/go-api".to_string(), "go-api".to_string()),
        ]
    );
    let projects: Vec<_> = engine.discover_by_type(TemplateType::Project).collect();
    assert_eq!(projects.len(), 1);
    assert!(engine.exists("features/broken"));
    assert!(!engine.exists("features/nope"));
}

#[test]
fn test_local_templates_shadow_builtin() {
    let temp = tempdir().unwrap();
    write(
        temp.path(),
        "features/logging/template.yaml",
        "name: local-logging\ntype: feature\nversion: \"2\"\nfiles: [{src: l.txt, dest: l.txt}]\n",
    );
    write(temp.path(), "features/logging/l.txt", "local");

    let builtin = MemorySource::new()
        .with_file(
            "features/logging/template.yaml",
            "name: logging\ntype: feature\nversion: \"1\"\nfiles: [{src: l.txt, dest: l.txt}]\n",
        )
        .with_file("features/logging/l.txt", "builtin")
        .with_file(
            "components/button/template.yaml",
            "name: button\ntype: component\nversion: \"1\"\nfiles: [{src: b.txt, dest: b.txt}]\n",
        )
        .with_file("components/button/b.txt", "button");

    let chain = ChainResolver::new()
        .with(SourceResolver::new(
            "local",
            Arc::new(DirSource::new(temp.path())),
        ))
        .with(SourceResolver::new("builtin", Arc::new(builtin)));

    let resolved = chain
        .resolve(&TemplateRef::new("logging", TemplateType::Feature))
        .unwrap();
    let (engine, location) = TemplateEngine::from_resolved(resolved);
    let files = engine.process(&location, &Context::new()).unwrap();
    assert_eq!(read(&files, "l.txt"), "local");

    let resolved = chain
        .resolve(&TemplateRef::new("button", TemplateType::Component))
        .unwrap();
    let (engine, location) = TemplateEngine::from_resolved(resolved);
    let files = engine.process(&location, &Context::new()).unwrap();
    assert_eq!(read(&files, "b.txt"), "button");
}

#[test]
fn test_src_outside_template_root_is_rejected() {
    let temp = tempdir().unwrap();
    write(temp.path(), "secret.txt", "TOP SECRET");
    let root = temp.path().join("templates");
    write(
        &root,
        "features/evil/template.yaml",
        "name: evil\ntype: feature\nversion: \"1\"\nfiles: [{src: ../../../secret.txt, dest: leaked.txt}]\n",
    );
    let engine = TemplateEngine::from_dir(&root);

    let err = engine
        .process("features/evil", &Context::new())
        .unwrap_err();
    assert!(err.to_string().starts_with("failed to load template"));
    assert!(matches!(err.root_cause(), TemplateError::Validation { .. }));
    assert!(err.root_cause().to_string().contains("must stay inside the template directory"));
}

#[test]
fn test_unterminated_action_aborts_rendering() {
    let temp = tempdir().unwrap();
    let root = temp.path();
    write(
        root,
        "features/f/template.yaml",
        "name: f\ntype: feature\nversion: \"1\"\nfiles: [{src: main.go.tmpl, dest: main.go.tmpl}]\n",
    );
    write(root, "features/f/main.go.tmpl", "package main {{");
    let engine = TemplateEngine::from_dir(root);

    let err = engine.process("features/f", &Context::new()).unwrap_err();
    assert_eq!(blueprint_templates::failed_stage(&err), Some(Stage::Render));
    assert!(matches!(err.root_cause(), TemplateError::Syntax(_)));
}
