use std::fmt;

/// Collects many independent failures into a single reportable error.
#[derive(Debug, Default)]
pub struct IndividualErrorList {
    list: Vec<anyhow::Error>,
}

impl IndividualErrorList {
    pub fn push(&mut self, err: anyhow::Error) { self.list.push(err); }

    pub fn len(&self) -> usize { self.list.len() }

    pub fn is_empty(&self) -> bool { self.list.is_empty() }
}

impl fmt::Display for IndividualErrorList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, err) in self.list.iter().enumerate() {
            writeln!(f, "[{}] {:#}", index, err)?;
        }
        Ok(())
    }
}

impl From<Vec<anyhow::Error>> for IndividualErrorList {
    fn from(list: Vec<anyhow::Error>) -> Self { IndividualErrorList { list } }
}
