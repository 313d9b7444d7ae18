mod input;
mod key_result;
mod product_form;
mod search_input;

pub use key_result::KeyResult;
pub use product_form::{FormEvent, FormMode, ProductForm};
pub use search_input::{SearchEvent, SearchInput};
