//! Starter documents written by `rig work create` and `rig sling`.

/// `build-frontend` -> `Build Frontend`
pub fn title(work_item: &str) -> String {
    work_item
        .replace('-', " ")
        .split(' ')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn spec(work_item: &str) -> String {
    format!(
        "# Spec: {}

## Overview

[Brief description of what this work aims to accomplish]

## Problem

[What problem are we solving?]

## Goals

[What are the specific objectives?]

## Non-Goals

[What are we explicitly not doing?]

## User Experience

[How will users interact with this feature?]

## Success Criteria

[How do we know when this is complete?]
",
        title(work_item)
    )
}

pub fn design(work_item: &str) -> String {
    format!(
        "# Design: {}

## Architecture

[High-level architectural approach]

## Components

[Key components and their responsibilities]

## Implementation Details

[Detailed technical approach]

## Risk Areas

[What could go wrong? How will we mitigate?]
",
        title(work_item)
    )
}

pub fn breakdown(work_item: &str) -> String {
    format!(
        "# Implementation Breakdown: {}

## Tasks

1. [Task 1]
2. [Task 2]
3. [Task 3]

[Add as many tasks as needed with clear done criteria]
",
        title(work_item)
    )
}

pub fn progress(work_item: &str) -> String {
    format!(
        "# Progress: {}

## Status: Not Started
## Assigned to:

## Checklist
- [ ] Spec review
- [ ] Initial design
- [ ] Design review
- [ ] Implementation breakdown
- [ ] Implementation
- [ ] Code review
- [ ] Testing
- [ ] Push feature branch
- [ ] Cleanup crew workspace

## Notes
",
        title(work_item)
    )
}

/// Instructions handed to whoever picks up the work item.
pub fn hook(work_item: &str, formula: &str) -> String {
    format!(
        "# Hook: {item}

## Your Assignment

You are working on: **{item}**

## Instructions

1. **Read the workflow formula**: Open and read work/formula/{formula}.md
   - This defines the phases you'll follow

2. **Read the spec**: Open and read work/{item}/spec.md
   - This describes what you're building

3. **Follow the formula**: Execute each phase in order
   - Update work/{item}/progress.md as you complete tasks
   - Commit your progress after each phase
   - Each commit should follow the pattern described in the formula

## Context Files

- Formula: work/formula/{formula}.md
- Spec: work/{item}/spec.md
- Design: work/{item}/design.md
- Breakdown: work/{item}/breakdown.md
- Progress: work/{item}/progress.md

## Important Notes

- Commit intermediate progress at each phase (don't wait until the end)
- Keep progress.md updated with your current status
- Follow the quality gates defined in the formula
- Ask questions if requirements are unclear

Ready? Start by reading the formula and spec files above.
",
        item = work_item,
        formula = formula
    )
}

/// The `build` formula seeded into every repository.
pub const DEFAULT_FORMULA: &str = r#"# Feature Implementation Formula

Autonomous end-to-end feature implementation with built-in quality gates.
Takes a spec, designs the approach, implements the solution, validates
with tests, and commits to local git repo.

## Process

### Phase 1: Spec Review (Read-Only)
1. Read the spec thoroughly
2. Identify what exists vs what's new
3. List dependencies on other systems/modules
4. Flag critical gaps:
   - Missing acceptance criteria
   - Unclear requirements
   - Ambiguous edge cases

**Gate:** If critical gaps exist, create `CLARIFICATIONS.md` and STOP. Otherwise continue.

### Phase 2: Design
1. Survey existing codebase for patterns to follow
2. Identify files to create/modify
3. Design module structure and interfaces
4. Plan test strategy (unit, integration, e2e)
5. Update `design.md` with:
   - Files to change
   - New abstractions needed
   - Testing approach
   - Risk areas
6. **Commit progress:** `git commit -am "docs: complete design phase"`

**Gate:** Review design. If major concerns, revise. Otherwise continue.

### Phase 3: Implementation Planning
1. Break design into tasks in `breakdown.md`. Each task should:
   - Be completable in one session
   - Have clear done criteria
   - Be independently testable
   - Produce a commit
2. Update progress.md checklist with specific tasks
3. **Commit progress:** `git commit -am "docs: create implementation breakdown"`

### Phase 4: Implementation
For each task:
1. Mark task as in progress in `progress.md`
2. Work on task until done criteria met
3. Run relevant tests
4. **Commit with message:** `feat: [task description]`
5. Mark task complete in `progress.md`

**Gate:** After each task, verify tests pass. If fail, fix before next task.

### Phase 5: Review
1. Read all changed code
2. Check against spec acceptance criteria
3. Verify test coverage
4. Look for:
   - Performance issues
   - Security concerns
   - Error handling gaps
   - Documentation needs
5. Create review notes in `progress.md`
6. **Commit progress:** `git commit -am "docs: complete code review"`

**Gate:** If major issues, fix and re-review. Otherwise continue.

### Phase 6: Final Steps
1. Run full test suite
2. Update any necessary documentation
3. Final verification against spec
4. Update `progress.md` status to "Ready for Merge"
5. **Final commit:** `git commit -am "docs: mark work ready for merge"`

## Important Notes

- **Commit intermediate progress at each phase** - This ensures work is always recoverable
- **Keep progress.md updated** - This is your state tracking mechanism
- **Each phase should leave work in a consistent state** - Anyone should be able to pick up from any phase
- **When complete, remind user to:**
  - Push feature branch: `git push -u origin feat/<feature-name>`
  - Cleanup crew workspace: `rig crew remove <worker-name>`
  - Create pull request if needed

## Outputs
- Updated `design.md` - Design document
- Updated `breakdown.md` - Implementation tasks
- Updated `progress.md` - Progress tracking with status
- Feature implementation with test coverage
- Git commits following conventional commits
"#;
