use std::path::PathBuf;
use std::sync::Arc;
use trove::loader::{
    Model, ModelFormat, ModelLoader, ModelLoaderConfiguration, ParserRegistry, PostLoadHook,
};

mod obj_parser;
use obj_parser::ObjParser;

pub fn configuration_path() -> PathBuf {
    PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/data/model_loader.json"
    ))
}

// Stands in for the renderer building vertex buffers for a freshly loaded model
struct LogPostLoadHook;

impl PostLoadHook for LogPostLoadHook {
    fn on_model_loaded(
        &self,
        model: &Model,
    ) {
        log::info!(
            "Building render data for {} ({}): {} pieces, radius {:.2}, textures {:?}",
            model.name,
            model.id,
            model.piece_count(),
            model.radius,
            model.textures
        );
    }
}

fn main() {
    // Setup logging
    env_logger::Builder::default()
        .write_style(env_logger::WriteStyle::Always)
        .filter_level(log::LevelFilter::Debug)
        .init();

    let configuration = ModelLoaderConfiguration::read_from_path(&configuration_path()).unwrap();

    let mut registry = ParserRegistry::default();
    registry.register(ModelFormat::Obj, Arc::new(ObjParser));

    let mut loader = ModelLoader::from_configuration(&configuration);
    loader.set_post_load_hook(Arc::new(LogPostLoadHook));
    loader.init(registry).unwrap();

    // Everything on the map is queued up front, the worker parses it while we do other things
    for name in ["armcom", "armflash", "rock", "broken", "missing_unit"] {
        loader.preload_model(name).unwrap();
    }

    while loader.pending_preloads() > 0 {
        std::thread::sleep(std::time::Duration::from_millis(15));
        profiling::finish_frame!();
    }

    for name in ["armcom", "ArmFlash", "rock.obj", "units/armcom.obj", "broken", "dragon"] {
        match loader.load_model(name, false) {
            Ok(model) => println!(
                "{} -> {} from {:?}, {} pieces, {} vertices, height {:.2}",
                name,
                model.id,
                model.path,
                model.piece_count(),
                model.root.vertex_count(),
                model.height
            ),
            Err(e) => println!("{} -> failed: {}", name, e),
        }
    }

    println!("{} models cached", loader.model_count());
    loader.kill();
}
