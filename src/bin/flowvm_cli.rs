use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use flowvm::inspect::{render_graph, render_program, strip_large_constants, StripOptions};
use flowvm::{compile, DType, Graph, Interpreter, KernelRegistry, MemoryMonitor, Tensor};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "flowvm", version)]
#[command(about = "Lower and execute tensor dataflow graphs", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print a human-readable listing of a graph
    Dump {
        /// Path to the graph JSON file
        graph: PathBuf,
        /// Elide constants with more elements than this threshold
        #[arg(long)]
        strip_above: Option<usize>,
    },
    /// Lower a graph and print (or write) the program JSON
    Lower {
        /// Path to the graph JSON file
        graph: PathBuf,
        /// Write the program JSON here instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Print the instruction listing instead of JSON
        #[arg(long)]
        listing: bool,
    },
    /// Lower a graph and execute it
    Run {
        /// Path to the graph JSON file
        graph: PathBuf,
        /// Path to a JSON file mapping input names to tensors
        #[arg(long)]
        inputs: Option<PathBuf>,
        /// Sample process memory usage around each instruction
        #[arg(long)]
        meminfo: bool,
    },
}

/// Hand-writable tensor literal for the `run` inputs file.
#[derive(Debug, Deserialize)]
struct InputSpec {
    dtype: String,
    shape: Vec<usize>,
    values: Vec<f64>,
}

impl InputSpec {
    fn into_tensor(self, name: &str) -> anyhow::Result<Tensor> {
        let dtype = DType::from_str(&self.dtype)
            .with_context(|| format!("input '{}': unknown dtype '{}'", name, self.dtype))?;
        let tensor = match dtype {
            DType::F32 => {
                let values: Vec<f32> = self.values.iter().map(|&v| v as f32).collect();
                Tensor::from_f32(self.shape, &values)?
            }
            DType::F64 => Tensor::from_f64(self.shape, &self.values)?,
            DType::I32 => {
                let values: Vec<i32> = self.values.iter().map(|&v| v as i32).collect();
                Tensor::from_i32(self.shape, &values)?
            }
            DType::I64 => {
                let values: Vec<i64> = self.values.iter().map(|&v| v as i64).collect();
                Tensor::from_i64(self.shape, &values)?
            }
            other => bail!("input '{}': dtype {} not supported in input files", name, other),
        };
        Ok(tensor)
    }
}

fn load_graph(path: &Path) -> anyhow::Result<Graph> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading graph file {}", path.display()))?;
    serde_json::from_str(&json).with_context(|| format!("parsing graph file {}", path.display()))
}

fn main() -> anyhow::Result<()> {
    flowvm::logging::init_from_env();
    let cli = Cli::parse();

    match cli.command {
        Commands::Dump { graph, strip_above } => {
            let mut graph = load_graph(&graph)?;
            if let Some(threshold) = strip_above {
                strip_large_constants(&mut graph, &StripOptions { threshold });
            }
            print!("{}", render_graph(&graph));
        }
        Commands::Lower {
            graph,
            output,
            listing,
        } => {
            let graph = load_graph(&graph)?;
            let program = compile(&graph)?;
            if listing {
                print!("{}", render_program(&program));
            } else {
                let json = program.to_json()?;
                match output {
                    Some(path) => std::fs::write(&path, json)
                        .with_context(|| format!("writing {}", path.display()))?,
                    None => println!("{}", json),
                }
            }
        }
        Commands::Run {
            graph,
            inputs,
            meminfo,
        } => {
            if meminfo {
                flowvm::meminfo::set_enabled(true);
            }
            let graph = load_graph(&graph)?;
            let program = compile(&graph)?;

            let registry = KernelRegistry::with_default_kernels();
            let mut interp = Interpreter::new(&program, &registry)
                .with_monitor(MemoryMonitor::from_process_flag());

            // Constants are designated program inputs; feed them from
            // the graph so the caller only supplies real inputs.
            for constant in &graph.constants {
                if constant.elided_elements.is_some() {
                    bail!("constant '{}' has been stripped; cannot execute", constant.name);
                }
                interp.feed_input(&constant.name, constant.tensor.clone())?;
            }
            if let Some(path) = inputs {
                let json = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading inputs file {}", path.display()))?;
                let specs: BTreeMap<String, InputSpec> = serde_json::from_str(&json)
                    .with_context(|| format!("parsing inputs file {}", path.display()))?;
                for (name, spec) in specs {
                    let tensor = spec.into_tensor(&name)?;
                    interp.feed_input(&name, tensor)?;
                }
            }

            let outputs = interp.run()?;
            for (name, tensor) in outputs.iter() {
                println!("{} = {}", name, tensor.summary());
                match tensor.dtype() {
                    DType::F32 => println!("  {:?}", tensor.as_f32()?),
                    DType::F64 => println!("  {:?}", tensor.as_f64()?),
                    DType::I32 => println!("  {:?}", tensor.as_i32()?),
                    DType::I64 => println!("  {:?}", tensor.as_i64()?),
                    _ => println!("  {} bytes", tensor.byte_size()),
                }
            }
        }
    }
    Ok(())
}
