// Background writers fed by the solver thread

pub mod imgstream;
