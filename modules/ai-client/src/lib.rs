pub mod openai;
pub mod util;

pub use openai::OpenAi;
pub use util::{clip_for_prompt, truncate_to_char_boundary};
