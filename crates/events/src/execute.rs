/// Decide, then evolve, with nothing to record in between.
///
/// Deterministic and IO-free. On error the aggregate is untouched, since
/// `handle` never mutates.
pub fn execute<A>(aggregate: &mut A, command: &A::Command) -> Result<Vec<A::Event>, A::Error>
where
    A: solewms_core::Aggregate,
{
    aggregate.commit_with(command, |_, _| Ok(()))
}
