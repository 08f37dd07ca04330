//! Bulk import screen for monument suggestions.
//!
//! A CSV file plus a column mapping can be validated (dry run) or turned into
//! create suggestions; the suggestions of a finished create job can then be
//! approved. Each of the three runs as a server-side job tracked by its own
//! `tracker::JobTracker`.

use yew::prelude::*;

mod helpers;
mod messages;
mod props;
mod state;
mod update;
mod view;

pub use messages::{BulkJob, Msg};
pub use props::BulkImportProps;
pub use state::BulkImportComponent;

impl Component for BulkImportComponent {
    type Message = Msg;
    type Properties = BulkImportProps;

    fn create(ctx: &Context<Self>) -> Self {
        BulkImportComponent::new(ctx.link(), &ctx.props().api_base)
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        update::update(self, ctx, msg)
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        view::view(self, ctx)
    }

    fn destroy(&mut self, _ctx: &Context<Self>) {
        self.cancel_all();
    }
}
