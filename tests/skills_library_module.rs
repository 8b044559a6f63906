use pls::config::ConfigValueType;
use pls::shared::Logger;
use pls::skills::{parse_skill_document, SkillLibrary};
use std::fs;
use tempfile::tempdir;

const DEPLOY: &str = r#"# Deploy

Some introduction that is not part of any section.

### Name
Deploy Service

### Description
Deploys the service to the chosen
environment using kubectl.

### Aliases
ship, release it

### Config
```yaml
deploy:
  VARIANT:
    context: string
    replicas: integer
```

### Steps
1. Switch context
2. Apply manifests
   and wait for rollout

### Execution
1. Switch: kubectl config use-context {deploy.VARIANT.context}
2. kubectl apply -f k8s/ && kubectl rollout status deploy/app

## Notes
- not an execution entry
"#;

#[test]
fn document_sections_are_parsed() {
    let skill = parse_skill_document("deploy", DEPLOY).expect("skill");
    assert_eq!(skill.name, "Deploy Service");
    assert_eq!(
        skill.description,
        "Deploys the service to the chosen environment using kubectl."
    );
    assert_eq!(skill.aliases, vec!["ship", "release it"]);
    assert_eq!(
        skill.steps,
        vec!["Switch context", "Apply manifests and wait for rollout"]
    );
    assert_eq!(
        skill.execution,
        vec![
            "kubectl config use-context {deploy.VARIANT.context}",
            "kubectl apply -f k8s/ && kubectl rollout status deploy/app",
        ]
    );
    assert_eq!(
        skill.config.type_of("deploy.prod.replicas"),
        Some(ConfigValueType::Number)
    );
    assert!(skill.is_valid);
    assert!(!skill.is_incomplete);
}

#[test]
fn documents_without_sections_are_not_skills() {
    assert!(parse_skill_document("notes", "# Notes\n\nJust prose.\n").is_none());
}

#[test]
fn name_falls_back_to_file_stem() {
    let skill = parse_skill_document(
        "cleanup",
        "### Description\nRemoves build artifacts from the tree.\n### Steps\n- Clean\n### Execution\n- make clean\n",
    )
    .expect("skill");
    assert_eq!(skill.name, "cleanup");
    assert!(skill.is_valid);
}

#[test]
fn load_dir_sorts_by_file_name_and_indexes_aliases() {
    let temp = tempdir().expect("tempdir");
    fs::write(temp.path().join("b-deploy.md"), DEPLOY).expect("write deploy");
    fs::write(
        temp.path().join("a-build.md"),
        "### Name\nBuild\n### Description\nShort\n### Steps\n- Compile\n### Execution\n- cargo build\n",
    )
    .expect("write build");
    fs::write(temp.path().join("readme.txt"), "### Name\nIgnored\n").expect("write txt");
    fs::write(temp.path().join("prose.md"), "no sections here\n").expect("write prose");

    let library = SkillLibrary::load_dir(temp.path(), &Logger::disabled()).expect("load");
    let names: Vec<&str> = library
        .skills()
        .iter()
        .map(|skill| skill.name.as_str())
        .collect();
    assert_eq!(names, vec!["Build", "Deploy Service"]);
    assert!(library.skills()[0].is_incomplete);

    for name in ["deploy service", "  Deploy   SERVICE ", "ship", "Release It", "b-deploy"] {
        assert_eq!(
            library.lookup(name).map(|skill| skill.name.as_str()),
            Some("Deploy Service"),
            "lookup `{name}`"
        );
    }
    assert!(library.lookup("unknown").is_none());
}

#[test]
fn missing_directory_is_an_empty_library() {
    let temp = tempdir().expect("tempdir");
    let library =
        SkillLibrary::load_dir(&temp.path().join("absent"), &Logger::disabled()).expect("load");
    assert!(library.is_empty());
    assert_eq!(library.catalogue(), "");
}

#[test]
fn catalogue_lists_only_valid_skills() {
    let library = SkillLibrary::from_skills(vec![
        parse_skill_document("deploy", DEPLOY).expect("deploy"),
        parse_skill_document(
            "broken",
            "### Name\nBroken\n### Description\nNever declared how to execute.\n### Steps\n- A\n",
        )
        .expect("broken"),
    ]);
    let catalogue = library.catalogue();
    assert!(catalogue.starts_with("### Deploy Service\n"));
    assert!(catalogue.contains("Aliases: ship, release it"));
    assert!(catalogue.contains("- Apply manifests and wait for rollout"));
    assert!(!catalogue.contains("Broken"));
}
