//! The `studyforge init` command.

use std::path::Path;

use anyhow::Result;

pub fn execute() -> Result<()> {
    write_if_absent(Path::new("studyforge.toml"), SAMPLE_CONFIG)?;

    std::fs::create_dir_all("blueprints")?;
    write_if_absent(Path::new("blueprints/example.toml"), EXAMPLE_BLUEPRINT)?;

    std::fs::create_dir_all("content")?;
    write_if_absent(Path::new("content/example.md"), EXAMPLE_CONTENT)?;

    println!("\nNext steps:");
    println!("  1. Start Ollama and pull a model: ollama pull llama3.2");
    println!("  2. Run: studyforge validate --blueprint blueprints/example.toml");
    println!("  3. Run: studyforge exam --blueprint blueprints/example.toml --format all");

    Ok(())
}

fn write_if_absent(path: &Path, content: &str) -> Result<()> {
    if path.exists() {
        println!("{} already exists, skipping.", path.display());
    } else {
        std::fs::write(path, content)?;
        println!("Created {}", path.display());
    }
    Ok(())
}

const SAMPLE_CONFIG: &str = r#"# studyforge configuration

default_provider = "ollama"
default_model = "llama3.2"
default_temperature = 0.7
max_tokens = 4096
parallelism = 4
max_retries = 3
request_timeout_secs = 300
max_attempts_per_level = 3
output_dir = "./studyforge-output"

[providers.ollama]
type = "ollama"
base_url = "http://localhost:11434"

# Any OpenAI-compatible server (llama.cpp, LM Studio, vLLM, api.openai.com)
# [providers.local]
# type = "openai"
# base_url = "http://localhost:1234"
# api_key = "${OPENAI_API_KEY}"
"#;

const EXAMPLE_BLUEPRINT: &str = r#"[exam]
title = "Cell Biology Basics"
question_type = "multiple-choice"
difficulty = "medium"
content = ["../content/example.md"]
max_attempts_per_level = 3

[distribution]
remember = 3
understand = 2
apply = 2
analyze = 1
"#;

const EXAMPLE_CONTENT: &str = r#"# The Cell

Cells are the basic structural and functional units of all living organisms.
Every cell is enclosed by a plasma membrane, a phospholipid bilayer that
controls which substances enter and leave.

## Organelles

The nucleus stores the cell's DNA and directs protein synthesis. Ribosomes
translate messenger RNA into proteins. Mitochondria carry out cellular
respiration, converting glucose and oxygen into ATP, the energy currency of
the cell. In plant cells, chloroplasts capture light energy through
photosynthesis.

## Transport

Small non-polar molecules cross the membrane by simple diffusion. Water moves
by osmosis from regions of low solute concentration to regions of high solute
concentration. Active transport uses ATP to move substances against their
concentration gradient.
"#;
