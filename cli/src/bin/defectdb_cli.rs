use clap::{Parser, Subcommand};
use cli::BuildConfig;
use color_eyre::eyre::Result;
use orthodefect::{
    build_database, BoundaryExtractor, BuildOptions, DefectDatabase, GeoExtent, NarrowMode,
    Orthoframe, OrthodefectError, StrategyKind, DEFAULT_SIMPLIFY_TOLERANCE,
};
use std::path::{Path, PathBuf};
use tracing::{info, warn};
use tracing_subscriber::{self, EnvFilter};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a consolidated defect database from a shapefile tree and an
    /// image tree
    Build {
        /// Root directory containing per-segment shapefile folders
        #[arg(short, long)]
        shapefile_root: PathBuf,
        /// Root directory containing per-segment image folders
        #[arg(short, long)]
        image_root: PathBuf,
        /// Path of the database artifact to write
        #[arg(short, long)]
        output: PathBuf,
        /// Matching strategy: "overlay" or "containment"
        #[arg(long, default_value = "overlay")]
        strategy: StrategyKind,
        /// Narrow the mask boundary inward before matching
        #[arg(long)]
        narrow: bool,
        /// Boundary simplification tolerance in pixel units
        #[arg(long, default_value_t = DEFAULT_SIMPLIFY_TOLERANCE)]
        tolerance: f64,
        /// Shapefile name inside each segment directory
        #[arg(long, default_value = orthodefect::pipeline::DEFAULT_SHAPEFILE_NAME)]
        shapefile_name: String,
        /// Attribute column carrying the defect category
        #[arg(long, default_value = orthodefect::io::shapefile::DEFAULT_CATEGORY_FIELD)]
        category_field: String,
        /// Also export the matched records as GeoJSON
        #[arg(long)]
        geojson: Option<PathBuf>,
    },
    /// Build a database using a TOML or JSON configuration file
    BuildFromConfig {
        /// Path to the configuration file
        #[arg(short, long)]
        config: PathBuf,
    },
    /// Print defect category statistics of a persisted database
    Stats {
        /// Path to the database artifact
        #[arg(short, long)]
        db: PathBuf,
    },
    /// Show the defects recorded for one orthoframe
    Show {
        /// Path to the database artifact
        #[arg(short, long)]
        db: PathBuf,
        /// Frame identifier (the "fn" column)
        #[arg(short, long)]
        frame: String,
    },
    /// Crop one defect occurrence out of its orthoframe raster
    Crop {
        /// Path to the database artifact
        #[arg(short, long)]
        db: PathBuf,
        /// Frame identifier (the "fn" column)
        #[arg(short, long)]
        frame: String,
        /// Index of the defect within the frame's entry
        #[arg(long, default_value_t = 0)]
        index: usize,
        /// Path of the PNG patch to write
        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            shapefile_root,
            image_root,
            output,
            strategy,
            narrow,
            tolerance,
            shapefile_name,
            category_field,
            geojson,
        } => {
            let mut boundary = BoundaryExtractor::default();
            boundary.tolerance = tolerance;
            if narrow {
                boundary.narrow = Some(NarrowMode::default());
            }

            let options = BuildOptions {
                strategy,
                boundary,
                shapefile_name,
                category_field,
                ..BuildOptions::default()
            };
            run_build(&shapefile_root, &image_root, &output, geojson.as_deref(), &options)?;
        }
        Commands::BuildFromConfig { config } => {
            let config = BuildConfig::from_file(&config)?;
            let options = options_from_config(&config)?;
            run_build(
                &config.shapefile_root,
                &config.image_root,
                &config.output,
                config.geojson_output.as_deref(),
                &options,
            )?;
        }
        Commands::Stats { db } => {
            run_stats(&db)?;
        }
        Commands::Show { db, frame } => {
            run_show(&db, &frame)?;
        }
        Commands::Crop {
            db,
            frame,
            index,
            output,
        } => {
            run_crop(&db, &frame, index, &output)?;
        }
    }

    Ok(())
}

fn options_from_config(config: &BuildConfig) -> Result<BuildOptions> {
    let mut options = BuildOptions::default();

    if let Some(strategy) = &config.strategy {
        options.strategy = strategy
            .parse::<StrategyKind>()
            .map_err(color_eyre::eyre::Report::msg)?;
    }
    if let Some(tolerance) = config.tolerance {
        options.boundary.tolerance = tolerance;
    }
    if config.narrow {
        options.boundary.narrow = Some(NarrowMode::default());
    }
    if let Some(name) = &config.shapefile_name {
        options.shapefile_name = name.clone();
    }
    if let Some(field) = &config.category_field {
        options.category_field = field.clone();
    }

    Ok(options)
}

fn run_build(
    shapefile_root: &Path,
    image_root: &Path,
    output: &Path,
    geojson: Option<&Path>,
    options: &BuildOptions,
) -> Result<()> {
    info!(
        shapefile_root = %shapefile_root.display(),
        image_root = %image_root.display(),
        "building defect database"
    );

    let db = build_database(shapefile_root, image_root, options)?;

    // Single write, after the whole batch has matched.
    db.save_json(output)?;
    info!(
        occurrences = db.len(),
        output = %output.display(),
        "defect database written"
    );

    if let Some(path) = geojson {
        db.save_geojson(path)?;
        info!(output = %path.display(), "GeoJSON export written");
    }

    Ok(())
}

fn run_stats(db_path: &Path) -> Result<()> {
    let db = DefectDatabase::load_json(db_path)?;

    println!("database: {}", db_path.display());
    println!("crs:      {}", db.crs);
    println!("records:  {}", db.len());
    println!("origins:  {}", db.origins().len());
    println!();
    for (category, count) in db.category_counts() {
        println!("{count:>8}  {category}");
    }

    Ok(())
}

fn run_show(db_path: &Path, frame: &str) -> Result<()> {
    let db = DefectDatabase::load_json(db_path)?;

    match db.get_file_entry(frame) {
        Some(entry) => {
            println!("frame:  {}", entry.frame_id);
            println!("origin: {}", entry.origin);
            println!(
                "extent: [{}, {}] x [{}, {}]",
                entry.extent.xmin, entry.extent.xmax, entry.extent.ymin, entry.extent.ymax
            );
            println!("defects:");
            for (i, (category, geometry)) in entry.defects.iter().enumerate() {
                let vertices = geometry.exterior().0.len();
                println!("{i:>4}  {category} ({vertices} vertices)");
            }
        }
        None => println!("no defects recorded for frame {frame}"),
    }

    Ok(())
}

fn run_crop(db_path: &Path, frame: &str, index: usize, output: &Path) -> Result<()> {
    let db = DefectDatabase::load_json(db_path)?;

    let Some(entry) = db.get_file_entry(frame) else {
        warn!(frame = %frame, "no defects recorded for frame, nothing to show");
        return Ok(());
    };
    let Some((category, geometry)) = entry.defects.get(index).copied() else {
        warn!(
            frame = %frame,
            index,
            available = entry.defects.len(),
            "no such defect occurrence, nothing to show"
        );
        return Ok(());
    };

    let raster_dir = db.image_root.join(entry.origin);
    let orthoframe = Orthoframe::load(&raster_dir, frame, entry.extent)?;

    let bbox = match GeoExtent::of_polygon(geometry) {
        Ok(bbox) => bbox,
        Err(OrthodefectError::InvalidExtent { .. }) => {
            warn!(frame = %frame, index, "degenerate defect geometry, nothing to show");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    match orthoframe.crop(&bbox) {
        Ok(patch) => {
            patch.save(output)?;
            info!(
                frame = %frame,
                index,
                category = %category,
                output = %output.display(),
                "defect patch written"
            );
        }
        Err(OrthodefectError::EmptyCrop { .. }) => {
            warn!(frame = %frame, index, "crop region is empty, nothing to show");
        }
        Err(e) => return Err(e.into()),
    }

    Ok(())
}
