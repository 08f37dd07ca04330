use yew::prelude::*;

#[derive(Properties, PartialEq, Clone)]
pub struct BulkImportProps {
    /// Base path of the bulk suggestion API.
    #[prop_or(AttrValue::Static(tracker::BULK_SUGGESTION_PATH))]
    pub api_base: AttrValue,
}
