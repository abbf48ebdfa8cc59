use crate::codec::TextCodec;

// Per-run settings passed explicitly into component calls; there is no
// ambient debug/verbose state anywhere.
#[derive(Debug)]
pub(crate) struct RunContext {
    pub(crate) debug: bool,
    pub(crate) codec: TextCodec,
    pub(crate) project: String,
}

#[cfg(test)]
impl RunContext {
    pub(crate) fn for_test() -> Self {
        Self {
            debug: false,
            codec: TextCodec::for_label("cp1251").expect("codec"),
            project: "Runner".to_string(),
        }
    }
}
