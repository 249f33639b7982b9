pub mod colormap;
pub mod figure;
pub mod projection;
pub mod writer;

pub use figure::{ProjectionRenderer, RenderOptions, RenderedFigure};
pub use writer::ImageWriter;
