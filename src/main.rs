//! # Quire CLI
//!
//! Usage:
//!   quire input.json -o program.json
//!   echo '{ ... }' | quire -o program.json
//!   quire --example > document.json

use std::env;
use std::fs;
use std::io::{self, Read};
use std::process;

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.iter().any(|a| a == "--example") {
        print!("{}", example_document_json());
        return;
    }

    let input = if args.len() > 1 && !args[1].starts_with('-') {
        fs::read_to_string(&args[1]).map_err(|e| format!("failed to read {}: {}", args[1], e))
    } else {
        let mut buf = String::new();
        io::stdin()
            .read_to_string(&mut buf)
            .map(|_| buf)
            .map_err(|e| format!("failed to read stdin: {}", e))
    };
    let input = input.unwrap_or_else(|e| fail(&e));

    let output_path = args
        .windows(2)
        .find(|w| w[0] == "-o")
        .map(|w| w[1].clone())
        .unwrap_or_else(|| "program.json".to_string());

    match quire::render_json(&input) {
        Ok(program) => {
            if let Err(e) = fs::write(&output_path, &program) {
                fail(&format!("failed to write {}: {}", output_path, e));
            }
            eprintln!("✓ Written {} bytes to {}", program.len(), output_path);
        }
        Err(e) => fail(&format!("failed to render document: {}", e)),
    }
}

fn fail(message: &str) -> ! {
    eprintln!("✗ {}", message);
    process::exit(1);
}

fn example_document_json() -> &'static str {
    r##"{
  "defaultPage": {
    "size": "A5",
    "margin": { "top": 36, "right": 36, "bottom": 36, "left": 36 }
  },
  "attributes": { "font-family": "Helvetica", "font-size": 11 },
  "children": [
    {
      "kind": { "type": "Page" },
      "children": [
        {
          "kind": { "type": "Fixed", "position": "Header" },
          "children": [
            {
              "kind": { "type": "Text", "content": "Quarterly Report" },
              "attributes": { "font-size": 9, "color": "#666666" }
            }
          ]
        },
        {
          "kind": { "type": "Text", "content": "Summary" },
          "attributes": { "font-size": 18, "margin-bottom": 8 }
        },
        {
          "kind": { "type": "Text", "content": "Revenue grew in every region this quarter, led by strong subscription renewals and two new enterprise accounts." }
        },
        {
          "kind": { "type": "List" },
          "attributes": { "list-type": "decimal", "list-position": "inside", "margin-top": 8 },
          "children": [
            { "kind": { "type": "Text", "content": "Renewals up 14%" } },
            { "kind": { "type": "Text", "content": "Churn down to 2.1%" } },
            { "kind": { "type": "Text", "content": "Two enterprise contracts signed" } }
          ]
        },
        {
          "kind": { "type": "Fixed", "position": "Footer" },
          "children": [
            {
              "kind": { "type": "PageText", "template": "Page {n} of {total}" },
              "attributes": { "font-size": 9 }
            }
          ]
        }
      ]
    }
  ]
}
"##
}
