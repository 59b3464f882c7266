mod threshold_invariant;
