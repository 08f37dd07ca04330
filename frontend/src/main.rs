use crate::app::App;

mod app;
mod components;
mod runtime;
mod transport;

fn main() {
    yew::Renderer::<App>::new().render();
}
