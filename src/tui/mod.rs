mod console;
mod input;
mod renderer;

pub use console::Console;
pub use input::handle_key;
pub use renderer::Renderer;
